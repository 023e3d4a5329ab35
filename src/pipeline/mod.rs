//! The two processing stages and the hand-off between them.
//!
//! * [`ChannelProcessor`]: one feed in, new entries out (dedup + fan-out).
//! * [`ItemProcessor`]: one entry in, one chat message out (transform,
//!   deliver, record).
//!
//! The stages only meet through [`DispatchedItem`] and the [`Dispatch`]
//! trait, so the transport between them can be swapped without touching
//! either side.

mod channel;
mod item;

pub use channel::{ChannelProcessor, ChannelReport};
pub use item::{assemble_message, truncate_message, ItemProcessor, MAX_MESSAGE_CHARS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::source::FeedEntry;

/// A newly discovered entry, addressed to its webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchedItem {
    /// Webhook the message goes to.
    pub notify: String,
    /// Display name of the feed, shown before the entry title.
    pub feed: String,
    pub id: String,
    pub updated: String,
    pub link: String,
    pub title: String,
    pub content: String,
}

impl DispatchedItem {
    pub fn new(notify: &str, feed: &str, entry: FeedEntry) -> Self {
        Self {
            notify: notify.to_string(),
            feed: feed.to_string(),
            id: entry.id,
            updated: entry.updated,
            link: entry.link,
            title: entry.title,
            content: entry.content,
        }
    }
}

/// Hands an item to whatever runs the [`ItemProcessor`].
///
/// Calls are independent; an `Ok` means the transport accepted the item,
/// not that it was delivered.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, item: DispatchedItem) -> Result<(), DispatchError>;
}
