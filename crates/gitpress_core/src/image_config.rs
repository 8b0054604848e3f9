//! Image-directory heuristics.
//!
//! Inspects a repository tree for build-tool marker files to infer the
//! static-site framework, then picks the directory image uploads should
//! land in and the public URL prefix those uploads will be served under.
//! An existing conventional image directory always beats the
//! framework-derived default.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::tree::TreeEntry;

/// Build-output prefixes that are stripped when converting an upload
/// directory to a public URL prefix.
const STRIP_PREFIXES: &[&str] = &["public/", "static/"];

/// Conventional image directories, checked in this order.
const IMAGE_DIR_CANDIDATES: &[&str] = &[
    "public/images",
    "public/blog/images",
    "public/assets/images",
    "static/images",
    "static/assets/images",
    "assets/images",
    "src/assets/images",
    "images",
];

/// Static-site framework inferred from root-level config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// astro.config.*
    Astro,
    /// next.config.*
    NextJs,
    /// svelte.config.*
    SvelteKit,
    /// hugo.toml / hugo.yaml / hugo.json
    Hugo,
    /// _config.yml / _config.yaml
    Jekyll,
    /// gatsby-config.*
    Gatsby,
}

/// Where image uploads go and how they are referenced from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ImageConfig {
    /// Repository-relative directory uploads are committed into.
    pub upload_dir: String,
    /// Public URL prefix for files in `upload_dir`, with a leading `/`.
    pub url_prefix: String,
}

/// Infer the framework from a set of paths, first marker file wins.
pub fn detect_framework(entries: &[TreeEntry]) -> Option<Framework> {
    for entry in entries {
        let p = entry.path.as_str();
        if p.starts_with("astro.config.") {
            return Some(Framework::Astro);
        }
        if p.starts_with("next.config.") {
            return Some(Framework::NextJs);
        }
        if p.starts_with("svelte.config.") {
            return Some(Framework::SvelteKit);
        }
        if matches!(p, "hugo.toml" | "hugo.yaml" | "hugo.json") {
            return Some(Framework::Hugo);
        }
        if matches!(p, "_config.yml" | "_config.yaml") {
            return Some(Framework::Jekyll);
        }
        if p.starts_with("gatsby-config.") {
            return Some(Framework::Gatsby);
        }
    }
    None
}

/// The public-assets directory a framework serves verbatim. Defaults to
/// "public" for unknown frameworks and plain repositories.
fn default_public_dir(framework: Option<Framework>) -> &'static str {
    match framework {
        Some(Framework::Hugo) | Some(Framework::SvelteKit) | Some(Framework::Gatsby) => "static",
        Some(Framework::Jekyll) => "assets",
        _ => "public",
    }
}

/// Strip the build-output prefix from an upload directory and prepend `/`.
fn to_url_prefix(upload_dir: &str) -> String {
    for prefix in STRIP_PREFIXES {
        if let Some(rest) = upload_dir.strip_prefix(prefix) {
            return format!("/{rest}");
        }
    }
    format!("/{upload_dir}")
}

/// Pick the image upload directory and URL prefix for a repository.
///
/// The first candidate directory (by list order) that already contains at
/// least one file wins; otherwise `{framework public dir}/images` is used.
pub fn detect_image_config(entries: &[TreeEntry]) -> ImageConfig {
    for dir in IMAGE_DIR_CANDIDATES {
        let prefix = format!("{dir}/");
        if entries.iter().any(|e| e.path.starts_with(&prefix)) {
            return ImageConfig {
                upload_dir: (*dir).to_string(),
                url_prefix: to_url_prefix(dir),
            };
        }
    }

    let framework = detect_framework(entries);
    let upload_dir = format!("{}/images", default_public_dir(framework));
    let url_prefix = to_url_prefix(&upload_dir);
    ImageConfig {
        upload_dir,
        url_prefix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nextjs_default() {
        let entries = vec![
            TreeEntry::file("next.config.js"),
            TreeEntry::file("package.json"),
        ];
        let config = detect_image_config(&entries);
        assert_eq!(config.upload_dir, "public/images");
        assert_eq!(config.url_prefix, "/images");
    }

    #[test]
    fn test_hugo_uses_static() {
        let entries = vec![TreeEntry::file("hugo.toml")];
        let config = detect_image_config(&entries);
        assert_eq!(config.upload_dir, "static/images");
        assert_eq!(config.url_prefix, "/images");
    }

    #[test]
    fn test_jekyll_uses_assets() {
        let entries = vec![TreeEntry::file("_config.yml")];
        let config = detect_image_config(&entries);
        assert_eq!(config.upload_dir, "assets/images");
        assert_eq!(config.url_prefix, "/assets/images");
    }

    #[test]
    fn test_no_framework_defaults_to_public() {
        let config = detect_image_config(&[TreeEntry::file("index.html")]);
        assert_eq!(config.upload_dir, "public/images");
        assert_eq!(config.url_prefix, "/images");
    }

    #[test]
    fn test_existing_dir_beats_framework_default() {
        // Hugo would default to static/images, but src/assets/images
        // already exists and wins.
        let entries = vec![
            TreeEntry::file("hugo.toml"),
            TreeEntry::file("src/assets/images/logo.png"),
        ];
        let config = detect_image_config(&entries);
        assert_eq!(config.upload_dir, "src/assets/images");
        assert_eq!(config.url_prefix, "/src/assets/images");
    }

    #[test]
    fn test_candidate_list_order_wins() {
        let entries = vec![
            TreeEntry::file("images/a.png"),
            TreeEntry::file("public/images/b.png"),
        ];
        // "public/images" precedes "images" in the candidate list even
        // though "images" appears first in the input.
        let config = detect_image_config(&entries);
        assert_eq!(config.upload_dir, "public/images");
        assert_eq!(config.url_prefix, "/images");
    }

    #[test]
    fn test_detect_framework_first_marker_wins() {
        let entries = vec![
            TreeEntry::file("gatsby-config.ts"),
            TreeEntry::file("next.config.mjs"),
        ];
        assert_eq!(detect_framework(&entries), Some(Framework::Gatsby));
    }
}
