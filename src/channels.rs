//! Channel configuration and the registry that lists it.
//!
//! A channel is one feed paired with one webhook.  The registry is a JSON
//! file holding an array of channels:
//!
//! ```json
//! [
//!   { "url": "https://blog.example.com/feed.xml", "notify": "https://chat.example.com/hook", "name": "Blog" }
//! ]
//! ```
//!
//! The file is re-read on every poll so channels can be added without a
//! restart.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One feed and the webhook its new entries are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Feed URL.
    pub url: String,
    /// Webhook URL.
    pub notify: String,
    /// Display name; defaults to the feed's own title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>, notify: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            notify: notify.into(),
            name: None,
        }
    }

    /// Name shown at the start of every message: the configured name, then
    /// the feed title, then the feed URL.
    pub fn display_name(&self, feed_title: Option<&str>) -> String {
        self.name
            .as_deref()
            .or(feed_title)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.url)
            .to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Missing("channel url"));
        }
        if self.notify.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "channel notify",
                reason: format!("empty notify URL for feed {}", self.url),
            });
        }
        Ok(())
    }
}

/// Lists channels from a JSON file.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    path: PathBuf,
}

impl ChannelRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate every channel in the registry.
    pub async fn list(&self) -> Result<Vec<ChannelConfig>, ConfigError> {
        let registry_err = |reason: String| ConfigError::Registry {
            path: self.path.display().to_string(),
            reason,
        };

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| registry_err(e.to_string()))?;
        let channels: Vec<ChannelConfig> =
            serde_json::from_slice(&bytes).map_err(|e| registry_err(e.to_string()))?;

        for channel in &channels {
            channel.validate()?;
        }
        Ok(channels)
    }
}
