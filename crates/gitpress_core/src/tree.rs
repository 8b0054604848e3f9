//! Repository tree entries.
//!
//! The file store's recursive-tree endpoint returns a flat list of paths
//! with a type tag. Both heuristics modules ([`crate::content_dir`] and
//! [`crate::image_config`]) work on this representation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Extensions treated as article content (case-insensitive).
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdx", "astro"];

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file ("blob" in git terms).
    File,
    /// A directory ("tree" in git terms).
    Dir,
}

/// A single entry of a repository's recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TreeEntry {
    /// Repository-relative path, `/`-separated, no leading slash.
    pub path: String,
    /// File or directory.
    pub kind: EntryKind,
}

impl TreeEntry {
    /// Convenience constructor for a file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    /// Convenience constructor for a directory entry.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }
}

/// Whether a path has one of the article content extensions.
pub fn is_markdown_path(path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((_, ext)) => MARKDOWN_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

/// The parent directory of a `/`-separated path, or `None` for root-level
/// paths.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_markdown_path() {
        assert!(is_markdown_path("posts/a.md"));
        assert!(is_markdown_path("posts/a.MDX"));
        assert!(is_markdown_path("src/content/blog/a.astro"));
        assert!(!is_markdown_path("posts/a.html"));
        assert!(!is_markdown_path("README"));
        assert!(!is_markdown_path("public/images/a.png"));
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("src/content/blog/a.md"), Some("src/content/blog"));
        assert_eq!(parent_dir("a.md"), None);
    }
}
