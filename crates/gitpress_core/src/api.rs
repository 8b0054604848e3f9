//! Versioned file store API boundary.
//!
//! The editor talks to GitHub (through the app server's proxy) for file
//! reads, writes and branch operations. This module abstracts that
//! collaborator behind the object-safe [`FileApi`] trait so the engine can
//! be driven by an HTTP client in production and by [`InMemoryFileApi`] in
//! tests and the WASM harness.
//!
//! ## Object safety
//!
//! `FileApi` is designed to be object-safe so it can be used behind
//! `dyn FileApi`. To enable this, all methods return boxed futures.

use std::collections::HashMap;
use std::future::Future;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::pin::Pin;
use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::error::{GitpressError, Result};

/// A boxed future for object-safe async methods.
///
/// On native targets, futures are `Send` for compatibility with
/// multi-threaded runtimes. On WASM, there's no `Send` requirement since
/// JavaScript is single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed future for object-safe async methods (WASM version, no `Send`).
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Error from the file store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The provided concurrency token is stale: the file changed since it
    /// was read.
    #[error("concurrency token is stale")]
    Conflict,

    /// File, branch or repository does not exist.
    #[error("not found")]
    NotFound,

    /// A branch with the requested name already exists.
    #[error("branch '{0}' already exists")]
    BranchExists(String),

    /// Any other HTTP-level failure.
    #[error("file store returned {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response message body.
        message: String,
    },

    /// The request never reached the store.
    #[error("network error: {0}")]
    Network(String),
}

impl ApiError {
    /// The HTTP status this error corresponds to, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Conflict => Some(409),
            ApiError::NotFound => Some(404),
            ApiError::BranchExists(_) => Some(422),
            ApiError::Status { code, .. } => Some(*code),
            ApiError::Network(_) => None,
        }
    }
}

/// Result type for file store operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A file as returned by the store: transport-encoded content plus the
/// concurrency token to present on the next write.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RemoteFile {
    /// Base64 content, possibly with embedded newlines.
    pub content: String,
    /// Concurrency token (git blob sha).
    pub sha: String,
}

impl RemoteFile {
    /// Decode the transport-encoded content to text.
    pub fn decoded(&self) -> Result<String> {
        decode_content(&self.content)
    }
}

/// A branch of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Sha of the branch head.
    pub sha: String,
}

/// Body of a file write, mirroring the store's PUT contents endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PutFileRequest {
    /// Commit message.
    pub message: String,
    /// Transport-encoded (base64) file content.
    pub content: String,
    /// Concurrency token of the version being replaced; `None` creates the
    /// file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    /// Branch to commit to.
    pub branch: String,
}

/// Abstraction over the versioned file store.
#[cfg(not(target_arch = "wasm32"))]
pub trait FileApi: Send + Sync {
    /// Fetch a file's content and concurrency token on a branch.
    fn fetch_file<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        branch: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, ApiResult<RemoteFile>>;

    /// Create or update a file; returns the new concurrency token.
    fn put_file<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
        request: &'a PutFileRequest,
    ) -> BoxFuture<'a, ApiResult<String>>;

    /// List a repository's branches.
    fn list_branches<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> BoxFuture<'a, ApiResult<Vec<Branch>>>;

    /// Create a branch pointing at `source_branch`'s head.
    fn create_branch<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        name: &'a str,
        source_branch: &'a str,
    ) -> BoxFuture<'a, ApiResult<Branch>>;
}

/// Abstraction over the versioned file store (WASM version, no `Send`).
#[cfg(target_arch = "wasm32")]
pub trait FileApi {
    /// Fetch a file's content and concurrency token on a branch.
    fn fetch_file<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        branch: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, ApiResult<RemoteFile>>;

    /// Create or update a file; returns the new concurrency token.
    fn put_file<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
        request: &'a PutFileRequest,
    ) -> BoxFuture<'a, ApiResult<String>>;

    /// List a repository's branches.
    fn list_branches<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> BoxFuture<'a, ApiResult<Vec<Branch>>>;

    /// Create a branch pointing at `source_branch`'s head.
    fn create_branch<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        name: &'a str,
        source_branch: &'a str,
    ) -> BoxFuture<'a, ApiResult<Branch>>;
}

// ============================================================================
// Transport encoding
// ============================================================================

/// Encode text for the store's content transport (base64).
pub fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode transport-encoded content to text.
///
/// The store wraps base64 in newlines; they are stripped before decoding.
pub fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;
    String::from_utf8(bytes).map_err(|_| GitpressError::ContentNotUtf8)
}

// ============================================================================
// In-memory implementation
// ============================================================================

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    sha: String,
}

#[derive(Debug, Clone, Default)]
struct BranchState {
    head: u64,
    files: HashMap<String, StoredFile>,
}

#[derive(Debug, Default)]
struct RepoState {
    branches: IndexMap<String, BranchState>,
}

/// In-memory file store for tests and the WASM harness.
///
/// Behaves like the real store where the engine can tell the difference:
/// content-derived blob shas, conflict on a stale (or missing) token for
/// an existing file, not-found for missing repos/branches/files, and
/// base64 content with embedded newlines.
#[derive(Debug, Default)]
pub struct InMemoryFileApi {
    repos: Mutex<HashMap<String, RepoState>>,
}

fn blob_sha(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Wrap base64 in 60-column lines the way the real store does.
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect::<Vec<_>>()
        .join("\n")
}

impl InMemoryFileApi {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating the repository and branch as needed.
    pub fn with_file(
        self,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
        content: &str,
    ) -> Self {
        self.add_file(owner, repo, branch, path, content);
        self
    }

    /// Seed a file on an existing instance.
    pub fn add_file(&self, owner: &str, repo: &str, branch: &str, path: &str, content: &str) {
        let mut repos = self.repos.lock().unwrap();
        let state = repos.entry(format!("{owner}/{repo}")).or_default();
        let branch_state = state.branches.entry(branch.to_string()).or_default();
        branch_state.head += 1;
        branch_state.files.insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                sha: blob_sha(content),
            },
        );
    }

    /// The current plain-text content of a file, for assertions.
    pub fn file_content(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Option<String> {
        let repos = self.repos.lock().unwrap();
        repos
            .get(&format!("{owner}/{repo}"))
            .and_then(|r| r.branches.get(branch))
            .and_then(|b| b.files.get(path))
            .map(|f| f.content.clone())
    }
}

impl FileApi for InMemoryFileApi {
    fn fetch_file<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        branch: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, ApiResult<RemoteFile>> {
        Box::pin(async move {
            let repos = self.repos.lock().unwrap();
            let file = repos
                .get(&format!("{owner}/{repo}"))
                .and_then(|r| r.branches.get(branch))
                .and_then(|b| b.files.get(path))
                .ok_or(ApiError::NotFound)?;
            Ok(RemoteFile {
                content: wrap_base64(&encode_content(&file.content)),
                sha: file.sha.clone(),
            })
        })
    }

    fn put_file<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        path: &'a str,
        request: &'a PutFileRequest,
    ) -> BoxFuture<'a, ApiResult<String>> {
        Box::pin(async move {
            let content = decode_content(&request.content).map_err(|e| ApiError::Status {
                code: 422,
                message: e.to_string(),
            })?;

            let mut repos = self.repos.lock().unwrap();
            let branch_state = repos
                .get_mut(&format!("{owner}/{repo}"))
                .and_then(|r| r.branches.get_mut(&request.branch))
                .ok_or(ApiError::NotFound)?;

            match branch_state.files.get(path) {
                Some(existing) => {
                    // Updates must present the current token
                    if request.sha.as_deref() != Some(existing.sha.as_str()) {
                        return Err(ApiError::Conflict);
                    }
                }
                None => {
                    // Creates must not present one
                    if request.sha.is_some() {
                        return Err(ApiError::Conflict);
                    }
                }
            }

            let sha = blob_sha(&content);
            branch_state.head += 1;
            branch_state
                .files
                .insert(path.to_string(), StoredFile { content, sha: sha.clone() });
            Ok(sha)
        })
    }

    fn list_branches<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> BoxFuture<'a, ApiResult<Vec<Branch>>> {
        Box::pin(async move {
            let repos = self.repos.lock().unwrap();
            let state = repos
                .get(&format!("{owner}/{repo}"))
                .ok_or(ApiError::NotFound)?;
            Ok(state
                .branches
                .iter()
                .map(|(name, b)| Branch {
                    name: name.clone(),
                    sha: format!("head-{:08x}", b.head),
                })
                .collect())
        })
    }

    fn create_branch<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        name: &'a str,
        source_branch: &'a str,
    ) -> BoxFuture<'a, ApiResult<Branch>> {
        Box::pin(async move {
            let mut repos = self.repos.lock().unwrap();
            let state = repos
                .get_mut(&format!("{owner}/{repo}"))
                .ok_or(ApiError::NotFound)?;
            if state.branches.contains_key(name) {
                return Err(ApiError::BranchExists(name.to_string()));
            }
            let source = state
                .branches
                .get(source_branch)
                .ok_or(ApiError::NotFound)?
                .clone();
            let sha = format!("head-{:08x}", source.head);
            state.branches.insert(name.to_string(), source);
            Ok(Branch {
                name: name.to_string(),
                sha,
            })
        })
    }
}

#[cfg(test)]
pub(crate) fn block_on_test<F: Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}
