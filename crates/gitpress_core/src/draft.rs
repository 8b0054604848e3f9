//! Draft persistence.
//!
//! Unsaved edits are cached locally, keyed by (owner, repo, branch, path),
//! so a reload does not lose work. Writes are debounced through a
//! [`Scheduler`] so rapid typing coalesces into one storage write; the
//! mode-switch boundaries bypass the debounce because losing a
//! just-computed conversion would be visible. Storage failures (quota) are
//! swallowed; drafts are best-effort and must never block editing.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use base64::Engine as _;
#[cfg(not(target_arch = "wasm32"))]
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Identity of a draft: one editing target in one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch the file was loaded from.
    pub branch: String,
    /// Repository-relative file path.
    pub path: String,
}

impl DraftKey {
    /// Create a key from its parts.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            path: path.into(),
        }
    }

    /// The namespaced storage key for this draft.
    pub fn storage_key(&self) -> String {
        format!(
            "draft:{}/{}/{}/{}",
            self.owner, self.repo, self.branch, self.path
        )
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Abstraction over local draft storage.
///
/// Implementations: browser localStorage (via the WASM host),
/// [`InMemoryDraftStorage`], and [`FsDraftStorage`] on native.
pub trait DraftStorage: Send + Sync {
    /// The last saved value for `key`, or `None`.
    fn load(&self, key: &str) -> Option<String>;

    /// Persist `content` under `key`. May fail (storage quota); callers
    /// treat failure as "draft not cached this time".
    fn save(&self, key: &str, content: &str) -> io::Result<()>;

    /// Remove the entry for `key`. Removing a missing entry is a no-op.
    fn remove(&self, key: &str);
}

/// In-memory draft storage for tests and headless hosts.
#[derive(Debug, Default)]
pub struct InMemoryDraftStorage {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<bool>,
}

impl InMemoryDraftStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail, simulating an exhausted quota.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Number of stored drafts.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DraftStorage for InMemoryDraftStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn save(&self, key: &str, content: &str) -> io::Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(io::Error::other("draft storage quota exceeded"));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), content.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// Filesystem-backed draft storage (one file per draft under a root
/// directory). Keys are URL-safe base64 so slashes in the draft key never
/// escape the root.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FsDraftStorage {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FsDraftStorage {
    /// Store drafts under `root` (created on first save).
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_for(&self, key: &str) -> std::path::PathBuf {
        self.root
            .join(format!("{}.draft", URL_SAFE_NO_PAD.encode(key)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DraftStorage for FsDraftStorage {
    fn load(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.file_for(key)).ok()
    }

    fn save(&self, key: &str, content: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.file_for(key), content)
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.file_for(key));
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Handle to a scheduled task.
pub type TaskId = u64;

/// A scheduled-task abstraction: run `task` after `delay`, unless
/// cancelled first. Supersedes the timer-based debounce of the original
/// editor so hosts (and tests) control time explicitly.
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run once after `delay`.
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> TaskId;

    /// Cancel a scheduled task. Cancelling a task that already ran is a
    /// no-op.
    fn cancel(&self, id: TaskId);
}

/// A scheduler driven by its owner: tasks run when [`run_pending`] is
/// called, delays are ignored. Used in tests and by hosts that pump a
/// timer themselves.
///
/// [`run_pending`]: ManualScheduler::run_pending
#[derive(Default)]
pub struct ManualScheduler {
    next_id: AtomicU64,
    tasks: Mutex<Vec<(TaskId, Box<dyn FnOnce() + Send>)>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every pending task, in scheduling order.
    pub fn run_pending(&self) {
        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        for (_, task) in tasks {
            task();
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, _delay: Duration, task: Box<dyn FnOnce() + Send>) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().unwrap().push((id, task));
        id
    }

    fn cancel(&self, id: TaskId) {
        self.tasks.lock().unwrap().retain(|(task_id, _)| *task_id != id);
    }
}

/// A real-time scheduler backed by one thread per task.
///
/// Draft debouncing schedules at most one task at a time, so the
/// thread-per-task cost is a non-issue.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Default)]
pub struct ThreadScheduler {
    next_id: AtomicU64,
    live: Arc<Mutex<std::collections::HashSet<TaskId>>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl ThreadScheduler {
    /// Create a scheduler.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().insert(id);
        let live = Arc::clone(&self.live);
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            // Still live means not cancelled; claim it so a late cancel
            // is a no-op.
            if live.lock().unwrap().remove(&id) {
                task();
            }
        });
        id
    }

    fn cancel(&self, id: TaskId) {
        self.live.lock().unwrap().remove(&id);
    }
}

// ============================================================================
// Draft manager
// ============================================================================

/// Default debounce delay for draft writes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounced draft persistence for one editing target.
pub struct DraftManager {
    storage: Arc<dyn DraftStorage>,
    scheduler: Arc<dyn Scheduler>,
    key: String,
    debounce: Duration,
    pending: Mutex<Option<TaskId>>,
}

impl DraftManager {
    /// Create a manager writing to `storage` through `scheduler`.
    pub fn new(
        storage: Arc<dyn DraftStorage>,
        scheduler: Arc<dyn Scheduler>,
        key: DraftKey,
        debounce: Duration,
    ) -> Self {
        Self {
            storage,
            scheduler,
            key: key.storage_key(),
            debounce,
            pending: Mutex::new(None),
        }
    }

    fn cancel_pending(&self) {
        if let Some(id) = self.pending.lock().unwrap().take() {
            self.scheduler.cancel(id);
        }
    }

    /// Save `content` after the debounce delay, superseding any pending
    /// save. Storage failures are logged and dropped.
    pub fn save(&self, content: String) {
        self.cancel_pending();
        let storage = Arc::clone(&self.storage);
        let key = self.key.clone();
        let id = self.scheduler.schedule(
            self.debounce,
            Box::new(move || {
                if let Err(e) = storage.save(&key, &content) {
                    log::debug!("draft not cached for '{key}': {e}");
                }
            }),
        );
        *self.pending.lock().unwrap() = Some(id);
    }

    /// Save `content` now, bypassing the debounce. Used at mode-switch
    /// boundaries.
    pub fn save_immediate(&self, content: &str) {
        self.cancel_pending();
        if let Err(e) = self.storage.save(&self.key, content) {
            log::debug!("draft not cached for '{}': {e}", self.key);
        }
    }

    /// The last saved draft, or `None`.
    pub fn load(&self) -> Option<String> {
        self.storage.load(&self.key)
    }

    /// Remove the draft and cancel any pending debounced write.
    pub fn clear(&self) {
        self.cancel_pending();
        self.storage.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(
        storage: &Arc<InMemoryDraftStorage>,
        scheduler: &Arc<ManualScheduler>,
    ) -> DraftManager {
        DraftManager::new(
            Arc::clone(storage) as Arc<dyn DraftStorage>,
            Arc::clone(scheduler) as Arc<dyn Scheduler>,
            DraftKey::new("octocat", "blog", "main", "posts/a.md"),
            DEFAULT_DEBOUNCE,
        )
    }

    #[test]
    fn test_debounced_saves_coalesce() {
        let storage = Arc::new(InMemoryDraftStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let drafts = manager(&storage, &scheduler);

        drafts.save("one".to_string());
        drafts.save("two".to_string());
        drafts.save("three".to_string());
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(drafts.load(), None);

        scheduler.run_pending();
        assert_eq!(drafts.load(), Some("three".to_string()));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_save_immediate_bypasses_debounce() {
        let storage = Arc::new(InMemoryDraftStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let drafts = manager(&storage, &scheduler);

        drafts.save("pending".to_string());
        drafts.save_immediate("now");
        assert_eq!(drafts.load(), Some("now".to_string()));
        // The pending debounced write was superseded.
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_clear_cancels_pending_write() {
        let storage = Arc::new(InMemoryDraftStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let drafts = manager(&storage, &scheduler);

        drafts.save_immediate("stored");
        drafts.save("pending".to_string());
        drafts.clear();
        scheduler.run_pending();
        assert_eq!(drafts.load(), None);
    }

    #[test]
    fn test_quota_failure_is_silent() {
        let storage = Arc::new(InMemoryDraftStorage::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let drafts = manager(&storage, &scheduler);

        storage.set_fail_writes(true);
        drafts.save_immediate("lost");
        drafts.save("also lost".to_string());
        scheduler.run_pending();
        assert_eq!(drafts.load(), None);
    }

    #[test]
    fn test_storage_key_shape() {
        let key = DraftKey::new("octocat", "blog", "main", "posts/a.md");
        assert_eq!(key.storage_key(), "draft:octocat/blog/main/posts/a.md");
    }

    #[test]
    fn test_fs_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsDraftStorage::new(dir.path().join("drafts"));
        let key = DraftKey::new("o", "r", "b", "p.md").storage_key();

        assert_eq!(storage.load(&key), None);
        storage.save(&key, "draft body").unwrap();
        assert_eq!(storage.load(&key), Some("draft body".to_string()));
        storage.remove(&key);
        assert_eq!(storage.load(&key), None);
        // Removing again is a no-op
        storage.remove(&key);
    }

    #[test]
    fn test_thread_scheduler_runs_and_cancels() {
        let scheduler = ThreadScheduler::new();
        let ran = Arc::new(Mutex::new(Vec::new()));

        let ran_a = Arc::clone(&ran);
        scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move || ran_a.lock().unwrap().push("a")),
        );
        let ran_b = Arc::clone(&ran);
        let cancelled = scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move || ran_b.lock().unwrap().push("b")),
        );
        scheduler.cancel(cancelled);

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(*ran.lock().unwrap(), vec!["a"]);
    }
}
