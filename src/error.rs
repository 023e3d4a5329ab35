//! Error types for every stage of the relay.
//!
//! Each failure class gets its own enum so callers can tell a feed that
//! could not be fetched apart from a webhook that rejected a message.  The
//! per-stage results ([`ChannelError`], [`ItemError`]) wrap them.

use thiserror::Error;

/// Feed fetch or parse failure.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed fetching feed {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("feed {url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed parsing feed {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// Record store read or write failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A single dispatch that was not acknowledged by the transport.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("dispatch queue is closed")]
    Closed,
}

/// HTML to chat markup conversion failure.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("content nests deeper than {limit} elements")]
    TooDeep { limit: usize },

    #[error("failed converting HTML: {0}")]
    Convert(#[from] std::io::Error),

    #[error("HTML converter panicked")]
    Panicked,
}

/// Webhook delivery failure.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("error making http request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response status: {status}, {body}")]
    Status { status: u16, body: String },
}

/// Startup configuration failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed reading channel registry {path}: {reason}")]
    Registry { path: String, reason: String },
}

/// Result of one channel processor invocation.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed checking processed items: {0}")]
    Store(#[from] StoreError),

    #[error("{failed} of {total} dispatches failed")]
    Dispatch { failed: usize, total: usize },
}

/// Result of one item processor invocation.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("failed converting to markdown: {0}")]
    Transform(#[from] TransformError),

    #[error("failed sending notification: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("failed updating record: {0}")]
    Store(#[from] StoreError),
}
