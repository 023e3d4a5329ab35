//! Runtime configuration.
//!
//! Built once in `main` from command-line flags (each with an environment
//! fallback) and handed to the components that need it.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::ConfigError;

/// Which record store backs dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Forget everything on exit.
    Memory,
    /// One JSON document per collection under the store directory.
    Json,
}

/// Everything `main` needs to wire the relay together.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file listing the channels.
    pub channels_path: PathBuf,
    pub store: StoreKind,
    pub store_dir: PathBuf,
    /// Record collection name.
    pub collection: String,
    pub poll_interval: Duration,
    /// Delivery attempts per item before giving up.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub queue_capacity: usize,
    pub http_timeout: Duration,
    /// Run one poll, drain the queue, exit.
    pub once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channels_path: PathBuf::from("channels.json"),
            store: StoreKind::Json,
            store_dir: PathBuf::from("data"),
            collection: "processed".to_string(),
            poll_interval: Duration::from_secs(300),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(5),
            queue_capacity: 256,
            http_timeout: Duration::from_secs(30),
            once: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("channels"));
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Missing("collection"));
        }
        if self.store == StoreKind::Json && self.store_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing("store-dir"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "interval-secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max-attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "queue-capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
