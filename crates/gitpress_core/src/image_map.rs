//! Image preview URL rewriting.
//!
//! While editing, inserted images point at ephemeral preview URLs (object
//! URLs or raw-content endpoints) so they render immediately. The map
//! remembers which final repository-relative URL each preview stands for,
//! and substitutes them when the document is serialized for a mode switch
//! or a commit. The map lives for one editing session and is never
//! persisted; previews from a previous page load will not resolve.

use chrono::Utc;
use indexmap::IndexMap;

/// Session-scoped mapping from ephemeral preview URL to final content URL.
#[derive(Debug, Default)]
pub struct ImageUrlMap {
    entries: IndexMap<String, String>,
}

impl ImageUrlMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a preview → final URL pair. Recording the same preview URL
    /// again replaces the final URL (last write wins).
    pub fn record(&mut self, preview_url: impl Into<String>, final_url: impl Into<String>) {
        self.entries.insert(preview_url.into(), final_url.into());
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every occurrence of every recorded preview URL with its
    /// final URL.
    ///
    /// Each entry is matched against the original text, not the output of
    /// earlier substitutions, so one entry's replacement can never be
    /// rewritten by another. Overlapping preview URLs resolve to the
    /// longest match. No recorded URL in the text is a no-op.
    pub fn rewrite(&self, text: &str) -> String {
        if self.entries.is_empty() {
            return text.to_string();
        }

        // Longest preview URL first, so a URL that is a prefix of another
        // never shadows it.
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'outer: while !rest.is_empty() {
            for key in &keys {
                if let Some(tail) = rest.strip_prefix(key) {
                    out.push_str(&self.entries[*key]);
                    rest = tail;
                    continue 'outer;
                }
            }
            let ch = rest.chars().next().unwrap();
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
        out
    }
}

/// Filename for a generated (AI) image, unique per insertion.
pub fn generated_image_filename() -> String {
    format!("ai-{}.png", Utc::now().timestamp_millis())
}
