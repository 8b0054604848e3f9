#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Versioned file store API boundary (fetch, write, branches)
pub mod api;

/// Commit orchestration (optimistic-concurrency writes)
pub mod commit;

/// Configuration options
pub mod config;

/// Content-directory heuristics
pub mod content_dir;

/// Rich-document model boundary
pub mod document;

/// Draft persistence (debounced local caching)
pub mod draft;

/// Error (common error types)
pub mod error;

/// Frontmatter codec
pub mod frontmatter;

/// Image-directory heuristics
pub mod image_config;

/// Image preview URL rewriting
pub mod image_map;

/// Editor session (mode reconciler)
pub mod session;

/// Repository tree entries
pub mod tree;
