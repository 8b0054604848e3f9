use serde::Serialize;
use thiserror::Error;

use crate::api::ApiError;

/// Unified error type for gitpress operations
#[derive(Debug, Error)]
pub enum GitpressError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Frontmatter errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frontmatter must be a mapping, got: {0}")]
    FrontmatterNotMapping(String),

    // Transport errors
    #[error("Invalid transport encoding: {0}")]
    ContentEncoding(#[from] base64::DecodeError),

    #[error("File content is not valid UTF-8")]
    ContentNotUtf8,

    // File store errors
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Conflict: file was modified elsewhere. Reload and try again.")]
    CommitConflict,

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Result type alias for gitpress operations
pub type Result<T> = std::result::Result<T, GitpressError>;

/// A serializable representation of GitpressError for the JS/IPC boundary
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP-ish status code from the file store (if applicable)
    pub status: Option<u16>,
}

impl From<&GitpressError> for SerializableError {
    fn from(err: &GitpressError) -> Self {
        let kind = match err {
            GitpressError::Io(_) => "Io",
            GitpressError::Yaml(_) => "Yaml",
            GitpressError::Json(_) => "Json",
            GitpressError::FrontmatterNotMapping(_) => "FrontmatterNotMapping",
            GitpressError::ContentEncoding(_) => "ContentEncoding",
            GitpressError::ContentNotUtf8 => "ContentNotUtf8",
            GitpressError::Api(_) => "Api",
            GitpressError::CommitConflict => "CommitConflict",
            GitpressError::ConfigParse(_) => "ConfigParse",
            GitpressError::ConfigSerialize(_) => "ConfigSerialize",
            GitpressError::NoConfigDir => "NoConfigDir",
            GitpressError::NotConfigured(_) => "NotConfigured",
        }
        .to_string();

        let status = match err {
            GitpressError::Api(api) => api.status(),
            GitpressError::CommitConflict => Some(409),
            _ => None,
        };

        Self {
            kind,
            message: err.to_string(),
            status,
        }
    }
}

impl From<GitpressError> for SerializableError {
    fn from(err: GitpressError) -> Self {
        SerializableError::from(&err)
    }
}

impl GitpressError {
    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}
