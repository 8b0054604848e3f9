//! Commit orchestration.
//!
//! Turning local edits into a store commit is a small protocol: compose
//! the final text, resolve which branch and concurrency token to present,
//! write, then reconcile session state with the outcome. Local state is
//! only touched after the store accepts the write, so a rejected commit
//! leaves the session (and its draft) exactly as it was.

use crate::api::{ApiError, Branch, FileApi, PutFileRequest, encode_content};
use crate::document::DocumentModel;
use crate::error::{GitpressError, Result};
use crate::session::EditorSession;

/// Where a commit should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitTarget {
    /// An existing branch, not necessarily the one the file was loaded
    /// from.
    Existing(String),
    /// A branch to create from the loaded branch, then commit to.
    New(String),
}

impl CommitTarget {
    fn branch(&self) -> &str {
        match self {
            CommitTarget::Existing(name) | CommitTarget::New(name) => name,
        }
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Branch the commit landed on.
    pub branch: String,
    /// Concurrency token of the committed version.
    pub new_sha: String,
    /// Refreshed branch list, if the refresh succeeded. Best-effort: a
    /// failure here never fails the commit.
    pub branches: Option<Vec<Branch>>,
}

impl EditorSession {
    /// Commit the session's current content.
    ///
    /// The token presented to the store depends on the target:
    ///
    /// - the loaded branch: the token from load (or the last commit);
    /// - another existing branch: that branch's current token, fetched
    ///   first; if the file does not exist there, the write creates it;
    /// - a new branch: the loaded token, since the new branch starts as a
    ///   copy of the loaded one.
    ///
    /// A stale token surfaces as [`GitpressError::CommitConflict`] with
    /// the session untouched, so the user can reload and retry without
    /// losing edits. On success the session adopts the new token and
    /// branch, and the draft is dropped.
    pub async fn commit(
        &mut self,
        api: &dyn FileApi,
        model: &dyn DocumentModel,
        message: &str,
        target: CommitTarget,
    ) -> Result<CommitOutcome> {
        let content = self.full_content(model)?;
        let file = self.file().clone();
        let branch = target.branch().to_string();

        let token = match &target {
            CommitTarget::New(name) => {
                api.create_branch(&file.owner, &file.repo, name, &file.branch)
                    .await?;
                Some(file.sha.clone())
            }
            CommitTarget::Existing(name) if *name == file.branch => Some(file.sha.clone()),
            CommitTarget::Existing(name) => {
                match api
                    .fetch_file(&file.owner, &file.repo, name, &file.path)
                    .await
                {
                    Ok(remote) => Some(remote.sha),
                    // File absent on the target branch: the write creates it
                    Err(ApiError::NotFound) => None,
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let message = if message.trim().is_empty() {
            format!("Update {}", file.path)
        } else {
            message.to_string()
        };

        let request = PutFileRequest {
            message,
            content: encode_content(&content),
            sha: token,
            branch: branch.clone(),
        };
        let new_sha = match api
            .put_file(&file.owner, &file.repo, &file.path, &request)
            .await
        {
            Ok(sha) => sha,
            Err(ApiError::Conflict) => return Err(GitpressError::CommitConflict),
            Err(e) => return Err(e.into()),
        };

        self.mark_committed(&branch, new_sha.clone());
        log::info!(
            "committed {}/{}/{} on {branch}",
            file.owner,
            file.repo,
            file.path
        );

        let branches = match api.list_branches(&file.owner, &file.repo).await {
            Ok(branches) => Some(branches),
            Err(e) => {
                log::warn!("branch list refresh failed: {e}");
                None
            }
        };

        Ok(CommitOutcome {
            branch,
            new_sha,
            branches,
        })
    }

    /// Sync wrapper for [`EditorSession::commit`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn commit_sync(
        &mut self,
        api: &dyn FileApi,
        model: &dyn DocumentModel,
        message: &str,
        target: CommitTarget,
    ) -> Result<CommitOutcome> {
        futures_lite::future::block_on(self.commit(api, model, message, target))
    }
}
