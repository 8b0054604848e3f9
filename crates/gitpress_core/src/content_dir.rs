//! Content-directory heuristics.
//!
//! Given a repository's raw tree, guess which directory holds the article
//! files. Conventional static-site generator layouts are checked first, in
//! a fixed priority order; if none match, the directory with the most
//! direct-child markdown files wins, provided it has at least two.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::tree::{self, EntryKind, TreeEntry};

/// Conventional content directories, checked in this order. The first
/// pattern that exists as a directory and has at least one direct-child
/// markdown file wins, regardless of how many files a later pattern holds.
const CONTENT_DIR_PATTERNS: &[&str] = &[
    "src/content/blog",
    "src/content/posts",
    "src/content/articles",
    "src/content/docs",
    "src/pages/blog",
    "src/pages/posts",
    "content/posts",
    "content/blog",
    "content/articles",
    "content/docs",
    "_posts",
    "posts",
    "blog",
    "articles",
];

/// Minimum direct-child markdown files for the fallback guess.
const FALLBACK_THRESHOLD: usize = 2;

/// Best-guess directory containing article files, or `None` if the tree
/// has no directory that looks like one.
pub fn detect_content_dir(entries: &[TreeEntry]) -> Option<String> {
    let dirs: HashSet<&str> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Dir)
        .map(|e| e.path.as_str())
        .collect();
    let files: Vec<&str> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::File && tree::is_markdown_path(&e.path))
        .map(|e| e.path.as_str())
        .collect();

    // Known patterns first
    for pattern in CONTENT_DIR_PATTERNS {
        if !dirs.contains(pattern) {
            continue;
        }
        let has_files = files
            .iter()
            .any(|f| tree::parent_dir(f) == Some(*pattern));
        if has_files {
            return Some((*pattern).to_string());
        }
    }

    // Fallback: the parent directory with the most direct-child markdown
    // files. IndexMap keeps insertion order, so ties go to the directory
    // encountered first in the input.
    let mut dir_counts: IndexMap<&str, usize> = IndexMap::new();
    for file in &files {
        if let Some(dir) = tree::parent_dir(file) {
            *dir_counts.entry(dir).or_insert(0) += 1;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (dir, count) in &dir_counts {
        if best.is_none_or(|(_, best_count)| *count > best_count) {
            best = Some((dir, *count));
        }
    }

    match best {
        Some((dir, count)) if count >= FALLBACK_THRESHOLD => Some(dir.to_string()),
        _ => None,
    }
}

/// Ancestor path prefixes of a content directory, including the directory
/// itself. The tree UI expands these so the detected directory is visible
/// on first render.
pub fn expanded_paths(content_dir: &str) -> Vec<String> {
    let parts: Vec<&str> = content_dir.split('/').collect();
    (1..=parts.len())
        .map(|i| parts[..i].join("/"))
        .collect()
}
