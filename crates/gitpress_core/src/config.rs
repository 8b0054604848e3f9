//! Editor configuration.
//!
//! A small TOML file holding the knobs that are host policy rather than
//! session state: the draft debounce delay, the image generation API key,
//! and the site homepage used for article URLs. On native targets the
//! file lives in the platform config directory; WASM hosts construct the
//! config from their own settings store and use [`EditorConfig::from_toml`]
//! / [`EditorConfig::to_toml`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GitpressError, Result};

/// Host-level editor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Delay before an edit is written to draft storage, in milliseconds.
    pub draft_debounce_ms: u64,

    /// API key for the image generation service. Generation is
    /// unavailable without it.
    pub image_api_key: Option<String>,

    /// Homepage of the deployed site, for deriving article URLs.
    pub site_homepage: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            draft_debounce_ms: 500,
            image_api_key: None,
            site_homepage: None,
        }
    }
}

impl EditorConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Serialize the config to TOML text.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The draft debounce delay as a [`Duration`].
    pub fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }

    /// The image API key, or [`GitpressError::NotConfigured`].
    pub fn require_image_api_key(&self) -> Result<&str> {
        self.image_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(GitpressError::NotConfigured("image API key"))
    }

    /// Path of the config file in the platform config directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Result<std::path::PathBuf> {
        let dir = dirs::config_dir().ok_or(GitpressError::NoConfigDir)?;
        Ok(dir.join("gitpress").join("config.toml"))
    }

    /// Load the config from `path`. A missing file yields the defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the config to `path`, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
