//! Editor session: the mode reconciler.
//!
//! An [`EditorSession`] owns the authoritative state of one open article:
//! the frontmatter mapping, the working body, which editing mode is
//! active, the unsaved-changes flag, and the session's image URL map. The
//! rich-document model and the raw textarea are views; raw text is the
//! single interchange format between them, because the model's native
//! representation is not stable across remounts.
//!
//! Mode state machine:
//!
//! ```text
//!            serialize (body -> image rewrite -> + frontmatter)
//!   Visual ────────────────────────────────────────────────────> Raw
//!          <────────────────────────────────────────────────────
//!            parse (split frontmatter, set_body on the model)
//! ```
//!
//! Both transitions persist an immediate (non-debounced) draft snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use ts_rs::TS;

use crate::api::FileApi;
use crate::document::{self, DocumentKind, DocumentModel};
use crate::draft::DraftManager;
use crate::error::Result;
use crate::frontmatter;
use crate::image_map::ImageUrlMap;

/// Which editing surface is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The rich-document (WYSIWYG) editor.
    Visual,
    /// The raw-text textarea.
    Raw,
}

/// Identity and version of the file being edited. The sha is the
/// optimistic-concurrency token last observed for (path, branch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FileHandle {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch the file was loaded from.
    pub branch: String,
    /// Repository-relative file path.
    pub path: String,
    /// Concurrency token of the loaded version.
    pub sha: String,
}

/// Content-directory prefixes stripped when deriving an article's public
/// URL from its repository path.
const CONTENT_PREFIXES: &[&str] = &[
    "src/content/",
    "content/",
    "src/pages/",
    "pages/",
    "_posts/",
];

/// One open article: the reconciler between modes, drafts and the store.
pub struct EditorSession {
    file: FileHandle,
    kind: DocumentKind,
    frontmatter: IndexMap<String, Value>,
    mode: Mode,
    /// Working value while in raw mode (full document text).
    raw_text: String,
    /// Body last handed to the visual model (its mount content).
    body: String,
    dirty: bool,
    /// The model fires one update notification after a programmatic
    /// set-content; that one is initialization, not a user edit.
    ignore_next_model_update: bool,
    images: ImageUrlMap,
    drafts: DraftManager,
}

impl EditorSession {
    /// Fetch a file and open an editing session on it.
    ///
    /// If a draft exists for the same (owner, repo, branch, path) and
    /// differs from the fetched content, the draft wins and the session
    /// starts with unsaved changes.
    pub async fn open(
        api: &dyn FileApi,
        drafts: DraftManager,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<Self> {
        let remote = api.fetch_file(owner, repo, branch, path).await?;
        let canonical = remote.decoded()?;

        let (content, dirty) = match drafts.load() {
            Some(draft) if draft != canonical => {
                log::info!("resuming draft for {owner}/{repo}/{branch}/{path}");
                (draft, true)
            }
            _ => (canonical, false),
        };

        let kind = DocumentKind::from_path(path);
        let parsed = if kind.has_frontmatter() {
            frontmatter::parse(&content)
        } else {
            frontmatter::ParsedDocument {
                frontmatter: IndexMap::new(),
                body: content,
            }
        };

        Ok(Self {
            file: FileHandle {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
                path: path.to_string(),
                sha: remote.sha,
            },
            kind,
            frontmatter: parsed.frontmatter,
            mode: Mode::Visual,
            raw_text: String::new(),
            body: parsed.body,
            dirty,
            // The visual model mounts with `body()` and fires its first
            // update notification for that set-content.
            ignore_next_model_update: true,
            images: ImageUrlMap::new(),
            drafts,
        })
    }

    /// Sync wrapper for [`EditorSession::open`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open_sync(
        api: &dyn FileApi,
        drafts: DraftManager,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<Self> {
        futures_lite::future::block_on(Self::open(api, drafts, owner, repo, branch, path))
    }

    /// The file identity and current concurrency token.
    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    /// The document kind, derived from the file extension.
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// The active editing mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The body text the visual model should currently display. Valid as
    /// mount content whenever the mode is [`Mode::Visual`].
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The raw-text working value. Valid whenever the mode is
    /// [`Mode::Raw`].
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Whether this document kind carries frontmatter at all. When false,
    /// the settings panel is hidden and commits write the body as-is.
    pub fn frontmatter_enabled(&self) -> bool {
        self.kind.has_frontmatter()
    }

    /// The held frontmatter mapping.
    pub fn frontmatter(&self) -> &IndexMap<String, Value> {
        &self.frontmatter
    }

    /// Replace the frontmatter mapping (settings panel edit).
    pub fn set_frontmatter(
        &mut self,
        frontmatter: IndexMap<String, Value>,
        model: &dyn DocumentModel,
    ) -> Result<()> {
        self.frontmatter = frontmatter;
        self.dirty = true;
        self.drafts.save(self.full_content(model)?);
        Ok(())
    }

    /// Whether the session has edits not yet committed.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Record an uploaded image: `preview_url` renders in the editor now,
    /// `final_url` is what gets committed.
    pub fn record_image_upload(
        &mut self,
        preview_url: impl Into<String>,
        final_url: impl Into<String>,
    ) {
        self.images.record(preview_url, final_url);
    }

    /// Notification that the user typed in the raw textarea.
    pub fn raw_edited(&mut self, text: String) {
        debug_assert_eq!(self.mode, Mode::Raw);
        self.raw_text = text;
        self.dirty = true;
        self.drafts.save(self.raw_text.clone());
    }

    /// Notification that the rich-document model changed.
    ///
    /// The first notification after a programmatic set-content is the
    /// model initializing itself and is ignored; everything after is a
    /// user edit.
    pub fn model_edited(&mut self, model: &dyn DocumentModel) -> Result<()> {
        if self.ignore_next_model_update {
            self.ignore_next_model_update = false;
            return Ok(());
        }
        self.dirty = true;
        self.drafts.save(self.full_content(model)?);
        Ok(())
    }

    /// Switch the active editing mode. No-op if `target` is already
    /// active.
    pub fn switch_mode(&mut self, target: Mode, model: &mut dyn DocumentModel) -> Result<()> {
        if target == self.mode {
            return Ok(());
        }
        match target {
            Mode::Raw => {
                let body = self.images.rewrite(&model.body(self.kind.body_format()));
                self.raw_text = if self.frontmatter_enabled() {
                    frontmatter::serialize(&self.frontmatter, &body)?
                } else {
                    body
                };
                self.drafts.save_immediate(&self.raw_text);
            }
            Mode::Visual => {
                let body = if self.frontmatter_enabled() {
                    let parsed = frontmatter::parse(&self.raw_text);
                    if !parsed.frontmatter.is_empty() {
                        self.frontmatter = parsed.frontmatter;
                    }
                    parsed.body
                } else {
                    self.raw_text.clone()
                };
                self.body = body;
                model.set_body(&self.body);
                self.ignore_next_model_update = true;
                self.drafts.save_immediate(&self.raw_text);
            }
        }
        log::debug!("switched to {target:?} mode for {}", self.file.path);
        self.mode = target;
        Ok(())
    }

    /// The final text to commit, irrespective of the active mode: body
    /// from whichever surface is live, image preview URLs rewritten,
    /// frontmatter composed via the codec.
    pub fn full_content(&self, model: &dyn DocumentModel) -> Result<String> {
        if self.mode == Mode::Raw {
            return Ok(self.images.rewrite(&self.raw_text));
        }
        let body = self.images.rewrite(&model.body(self.kind.body_format()));
        if !self.frontmatter_enabled() {
            return Ok(body);
        }
        frontmatter::serialize(&self.frontmatter, &body)
    }

    /// Drop local edits: clear the draft and the unsaved flag. The caller
    /// re-fetches and reopens.
    pub fn discard(&mut self) {
        self.drafts.clear();
        self.dirty = false;
    }

    /// Default prompt for generating an illustration at the cursor, or
    /// `None` when the model reports no usable context.
    pub fn image_prompt(&self, model: &dyn DocumentModel) -> Option<String> {
        model
            .cursor_context()
            .as_ref()
            .and_then(document::image_prompt)
    }

    /// Public URL of this article on the deployed site.
    pub fn article_url(&self, homepage: &str) -> String {
        derive_article_url(homepage, &self.file.path, &self.frontmatter)
    }

    /// Record a successful commit: adopt the new token (and branch, when
    /// the commit landed elsewhere), drop the draft and the unsaved flag.
    pub(crate) fn mark_committed(&mut self, branch: &str, new_sha: String) {
        self.file.branch = branch.to_string();
        self.file.sha = new_sha;
        self.dirty = false;
        self.drafts.clear();
    }
}

/// Derive an article's public URL from the site homepage, its repository
/// path and its frontmatter. A `slug` frontmatter entry overrides the
/// path-derived route.
pub fn derive_article_url(
    homepage: &str,
    path: &str,
    frontmatter: &IndexMap<String, Value>,
) -> String {
    let base = homepage.trim_end_matches('/');

    if let Some(slug) = frontmatter::get_string(frontmatter, "slug") {
        return if slug.starts_with('/') {
            format!("{base}{slug}")
        } else {
            format!("{base}/{slug}")
        };
    }

    let mut route = path;
    for prefix in CONTENT_PREFIXES {
        if let Some(rest) = route.strip_prefix(prefix) {
            route = rest;
            break;
        }
    }
    for ext in [".mdx", ".astro", ".html", ".md"] {
        if let Some(rest) = route.strip_suffix(ext) {
            route = rest;
            break;
        }
    }
    let route = route.strip_suffix("/index").unwrap_or(route);

    format!("{base}/{route}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::api::InMemoryFileApi;
    use crate::document::BufferModel;
    use crate::draft::{
        DraftKey, DraftStorage, InMemoryDraftStorage, ManualScheduler, Scheduler,
    };

    const ARTICLE: &str = "---\ntitle: Hello\ndraft: false\n---\n# Hello\n\nFirst post.\n";

    pub(crate) struct Harness {
        pub api: InMemoryFileApi,
        pub storage: Arc<InMemoryDraftStorage>,
        pub scheduler: Arc<ManualScheduler>,
    }

    impl Harness {
        pub fn new(path: &str, content: &str) -> Self {
            Self {
                api: InMemoryFileApi::new().with_file("octocat", "blog", "main", path, content),
                storage: Arc::new(InMemoryDraftStorage::new()),
                scheduler: Arc::new(ManualScheduler::new()),
            }
        }

        pub fn drafts(&self, path: &str) -> DraftManager {
            DraftManager::new(
                Arc::clone(&self.storage) as Arc<dyn DraftStorage>,
                Arc::clone(&self.scheduler) as Arc<dyn Scheduler>,
                DraftKey::new("octocat", "blog", "main", path),
                Duration::from_millis(500),
            )
        }

        pub fn open(&self, path: &str) -> EditorSession {
            EditorSession::open_sync(&self.api, self.drafts(path), "octocat", "blog", "main", path)
                .unwrap()
        }
    }

    #[test]
    fn test_open_splits_frontmatter() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let session = h.open("posts/hello.md");

        assert_eq!(session.mode(), Mode::Visual);
        assert!(session.frontmatter_enabled());
        assert_eq!(
            frontmatter::get_string(session.frontmatter(), "title"),
            Some("Hello")
        );
        assert_eq!(session.body(), "# Hello\n\nFirst post.\n");
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_open_html_skips_frontmatter() {
        let h = Harness::new("site/about.html", "<h1>About</h1>");
        let session = h.open("site/about.html");
        assert!(!session.frontmatter_enabled());
        assert_eq!(session.body(), "<h1>About</h1>");
    }

    #[test]
    fn test_open_prefers_differing_draft() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        h.drafts("posts/hello.md").save_immediate("---\ntitle: Edited\n---\nDraft body\n");

        let session = h.open("posts/hello.md");
        assert!(session.has_unsaved_changes());
        assert_eq!(session.body(), "Draft body\n");
        assert_eq!(
            frontmatter::get_string(session.frontmatter(), "title"),
            Some("Edited")
        );
    }

    #[test]
    fn test_open_ignores_identical_draft() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        h.drafts("posts/hello.md").save_immediate(ARTICLE);

        let session = h.open("posts/hello.md");
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_first_model_update_is_not_an_edit() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        // Mount notification
        session.model_edited(&model).unwrap();
        assert!(!session.has_unsaved_changes());

        // Genuine edit
        model.set_body("# Hello\n\nEdited.\n");
        session.model_edited(&model).unwrap();
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn test_switch_to_raw_composes_full_document() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        session.switch_mode(Mode::Raw, &mut model).unwrap();
        assert_eq!(session.mode(), Mode::Raw);
        assert_eq!(
            session.raw_text(),
            "---\ntitle: Hello\ndraft: false\n---\n# Hello\n\nFirst post.\n"
        );
        // Immediate draft snapshot, no debounce
        assert_eq!(
            h.storage.load("draft:octocat/blog/main/posts/hello.md"),
            Some(session.raw_text().to_string())
        );
    }

    #[test]
    fn test_mode_switch_round_trip_preserves_body() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        session.switch_mode(Mode::Raw, &mut model).unwrap();
        session.switch_mode(Mode::Visual, &mut model).unwrap();

        assert_eq!(session.body(), "# Hello\n\nFirst post.\n");
        assert_eq!(model.body(crate::document::BodyFormat::Markdown), session.body());
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_raw_frontmatter_edit_flows_back_to_visual() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        session.switch_mode(Mode::Raw, &mut model).unwrap();
        session.raw_edited("---\ntitle: Renamed\n---\nNew body\n".to_string());
        session.switch_mode(Mode::Visual, &mut model).unwrap();

        assert_eq!(
            frontmatter::get_string(session.frontmatter(), "title"),
            Some("Renamed")
        );
        assert_eq!(session.body(), "New body\n");
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn test_model_remount_notification_suppressed_after_switch() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());
        session.model_edited(&model).unwrap(); // mount

        session.switch_mode(Mode::Raw, &mut model).unwrap();
        session.switch_mode(Mode::Visual, &mut model).unwrap();

        // The set_body during the switch remounts the model; its
        // notification must not count as an edit.
        session.model_edited(&model).unwrap();
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_full_content_in_visual_mode_rewrites_images() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        session.record_image_upload("blob:p1", "/images/final.png");
        model.set_body("# Hello\n\n![pic](blob:p1)\n");

        let content = session.full_content(&model).unwrap();
        assert_eq!(
            content,
            "---\ntitle: Hello\ndraft: false\n---\n# Hello\n\n![pic](/images/final.png)\n"
        );
    }

    #[test]
    fn test_full_content_in_raw_mode_rewrites_images() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        session.record_image_upload("blob:p1", "/images/final.png");
        session.switch_mode(Mode::Raw, &mut model).unwrap();
        session.raw_edited("---\ntitle: Hello\n---\n![a](blob:p1) ![b](blob:p1)\n".to_string());

        let content = session.full_content(&model).unwrap();
        assert_eq!(
            content,
            "---\ntitle: Hello\n---\n![a](/images/final.png) ![b](/images/final.png)\n"
        );
    }

    #[test]
    fn test_no_frontmatter_file_commits_body_as_is() {
        let h = Harness::new("site/about.html", "<h1>About</h1>");
        let mut session = h.open("site/about.html");
        let mut model = BufferModel::new(session.body());

        // A literal leading --- in a markup file stays in the body across
        // a raw round trip.
        session.switch_mode(Mode::Raw, &mut model).unwrap();
        session.raw_edited("---\nnot frontmatter\n---\n<h1>About</h1>".to_string());
        session.switch_mode(Mode::Visual, &mut model).unwrap();
        assert_eq!(session.body(), "---\nnot frontmatter\n---\n<h1>About</h1>");
        assert!(session.frontmatter().is_empty());

        let content = session.full_content(&model).unwrap();
        assert_eq!(content, "---\nnot frontmatter\n---\n<h1>About</h1>");
    }

    #[test]
    fn test_raw_edit_saves_debounced_draft() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        session.switch_mode(Mode::Raw, &mut model).unwrap();
        session.raw_edited("typing".to_string());
        session.raw_edited("typing more".to_string());

        // Only the coalesced write lands
        h.scheduler.run_pending();
        assert_eq!(
            h.storage.load("draft:octocat/blog/main/posts/hello.md"),
            Some("typing more".to_string())
        );
    }

    #[test]
    fn test_discard_clears_draft_and_flag() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        session.switch_mode(Mode::Raw, &mut model).unwrap();
        session.raw_edited("scrap this".to_string());
        session.discard();

        assert!(!session.has_unsaved_changes());
        h.scheduler.run_pending();
        assert_eq!(h.storage.load("draft:octocat/blog/main/posts/hello.md"), None);
    }

    #[test]
    fn test_set_frontmatter_marks_dirty() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let mut session = h.open("posts/hello.md");
        let model = BufferModel::new(session.body());

        let mut fm = session.frontmatter().clone();
        frontmatter::set_property(&mut fm, "title", Value::String("Better title".into()));
        session.set_frontmatter(fm, &model).unwrap();

        assert!(session.has_unsaved_changes());
        assert_eq!(
            frontmatter::get_string(session.frontmatter(), "title"),
            Some("Better title")
        );
    }

    #[test]
    fn test_article_url_from_path() {
        let h = Harness::new("src/content/blog/first-post.md", ARTICLE);
        let session = h.open("src/content/blog/first-post.md");
        // ARTICLE has no slug key
        assert_eq!(
            session.article_url("https://example.com/"),
            "https://example.com/blog/first-post"
        );
    }

    #[test]
    fn test_article_url_slug_overrides_path() {
        let content = "---\ntitle: Hello\nslug: /writing/hello\n---\nBody";
        let h = Harness::new("src/content/blog/first-post.md", content);
        let session = h.open("src/content/blog/first-post.md");
        assert_eq!(
            session.article_url("https://example.com"),
            "https://example.com/writing/hello"
        );
    }

    #[test]
    fn test_derive_article_url_index_collapse() {
        let fm = IndexMap::new();
        assert_eq!(
            derive_article_url("https://example.com", "content/docs/guide/index.md", &fm),
            "https://example.com/docs/guide"
        );
    }

    #[test]
    fn test_image_prompt_passthrough() {
        let h = Harness::new("posts/hello.md", ARTICLE);
        let session = h.open("posts/hello.md");
        let mut model = BufferModel::new(session.body());

        assert_eq!(session.image_prompt(&model), None);

        model.set_cursor_context(Some(crate::document::CursorContext {
            nearest_heading: Some("Hello".to_string()),
            surrounding_text: None,
        }));
        let prompt = session.image_prompt(&model).unwrap();
        assert!(prompt.contains("section \"Hello\""));
    }
}
