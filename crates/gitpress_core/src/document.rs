//! Rich-document model boundary.
//!
//! The WYSIWYG engine keeps its own mutable node tree; this crate never
//! walks it. Everything the reconciler needs is behind [`DocumentModel`]:
//! get the current body in a serialized form, replace the whole body, and
//! answer the one structural query the UI needs (nearest heading and
//! surrounding text at the cursor, for generated-image prompts).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Kind of document being edited, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Plain markdown (`.md`).
    Markdown,
    /// MDX (`.mdx`).
    Mdx,
    /// Astro component (`.astro`): frontmatter plus markup body.
    Astro,
    /// Anything else the editor can open (`.html` and friends).
    Markup,
}

/// The serialization format a document's body round-trips through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// Markdown text.
    Markdown,
    /// HTML-ish markup.
    Markup,
}

impl DocumentKind {
    /// Classify a repository path by extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") => DocumentKind::Markdown,
            Some("mdx") => DocumentKind::Mdx,
            Some("astro") => DocumentKind::Astro,
            _ => DocumentKind::Markup,
        }
    }

    /// Whether files of this kind carry a frontmatter block. Kinds without
    /// one skip the codec entirely: the body is the whole file.
    pub fn has_frontmatter(&self) -> bool {
        matches!(
            self,
            DocumentKind::Markdown | DocumentKind::Mdx | DocumentKind::Astro
        )
    }

    /// The body serialization for this kind.
    pub fn body_format(&self) -> BodyFormat {
        match self {
            DocumentKind::Markdown | DocumentKind::Mdx => BodyFormat::Markdown,
            DocumentKind::Astro | DocumentKind::Markup => BodyFormat::Markup,
        }
    }
}

/// Text surrounding the cursor, as reported by the document model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CursorContext {
    /// Text of the nearest heading above the cursor, if any.
    pub nearest_heading: Option<String>,
    /// Plain text of the block at (or just before) the cursor, if any.
    pub surrounding_text: Option<String>,
}

/// Narrow interface to the rich-document model.
///
/// Implemented by the JS/WASM bridge to the actual WYSIWYG engine, and by
/// [`BufferModel`] for tests and headless use.
pub trait DocumentModel {
    /// Serialize the current document body in the given format.
    fn body(&self, format: BodyFormat) -> String;

    /// Replace the whole document body. The engine re-mounts and will fire
    /// one update notification that is not a user edit; the session
    /// suppresses it.
    fn set_body(&mut self, body: &str);

    /// Heading and surrounding text at the current cursor position.
    /// `None` if the model has no cursor (e.g. headless).
    fn cursor_context(&self) -> Option<CursorContext> {
        None
    }
}

/// A trivial [`DocumentModel`] that stores the body as a string.
///
/// Serialization is the identity in both formats, which makes it useful
/// for tests and for hosts that have no editor mounted yet.
#[derive(Debug, Clone, Default)]
pub struct BufferModel {
    body: String,
    context: Option<CursorContext>,
}

impl BufferModel {
    /// Create a model holding `body`.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            context: None,
        }
    }

    /// Set the cursor context returned by [`DocumentModel::cursor_context`].
    pub fn set_cursor_context(&mut self, context: Option<CursorContext>) {
        self.context = context;
    }
}

impl DocumentModel for BufferModel {
    fn body(&self, _format: BodyFormat) -> String {
        self.body.clone()
    }

    fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
    }

    fn cursor_context(&self) -> Option<CursorContext> {
        self.context.clone()
    }
}

/// Maximum surrounding-text length quoted in a generated-image prompt.
const PROMPT_CONTEXT_LIMIT: usize = 200;

/// Build the default prompt for generating an illustration at the cursor.
///
/// Returns `None` when the context is empty; the UI then falls back to a
/// blank prompt field.
pub fn image_prompt(context: &CursorContext) -> Option<String> {
    let heading = context
        .nearest_heading
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let surrounding = context
        .surrounding_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if heading.is_none() && surrounding.is_none() {
        return None;
    }

    let mut parts = Vec::new();
    if let Some(h) = heading {
        parts.push(format!("section \"{h}\""));
    }
    if let Some(s) = surrounding {
        let clamped = if s.chars().count() > PROMPT_CONTEXT_LIMIT {
            let cut: String = s.chars().take(PROMPT_CONTEXT_LIMIT).collect();
            format!("{cut}...")
        } else {
            s.to_string()
        };
        parts.push(format!("context: \"{clamped}\""));
    }

    Some(format!(
        "A blog illustration for a {}. The illustration should be in a clean, minimal, modern style.",
        parts.join(", ")
    ))
}
