//! Channel processing: which entries of a feed are new, and hand them off.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use super::{Dispatch, DispatchedItem};
use crate::channels::ChannelConfig;
use crate::error::{ChannelError, StoreError};
use crate::source::{FeedEntry, FeedSource, ParsedFeed};
use crate::store::RecordStore;

/// What one channel invocation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelReport {
    /// Entries in the feed.
    pub total: usize,
    /// Entries dropped because they had no identifier.
    pub skipped_without_id: usize,
    /// Entries not yet in the record store.
    pub new: usize,
}

/// Turns one channel's feed into dispatched items.
///
/// Only reads the record store; records are written by the item side once
/// a message has actually been delivered.
pub struct ChannelProcessor {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn RecordStore>,
    dispatcher: Arc<dyn Dispatch>,
}

impl ChannelProcessor {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        Self {
            source,
            store,
            dispatcher,
        }
    }

    /// Fetch the channel's feed, then [`process`](Self::process) it.
    pub async fn run(&self, channel: &ChannelConfig) -> Result<ChannelReport, ChannelError> {
        let feed = self.source.fetch(&channel.url).await?;
        self.process(channel, feed).await
    }

    /// Dedup an already-parsed feed and dispatch every new entry.
    ///
    /// Returns [`ChannelError::Dispatch`] when any dispatch failed; the
    /// successful ones have still been sent.
    pub async fn process(
        &self,
        channel: &ChannelConfig,
        feed: ParsedFeed,
    ) -> Result<ChannelReport, ChannelError> {
        let feed_name = channel.display_name(feed.title.as_deref());
        let total = feed.entries.len();

        let (usable, skipped): (Vec<FeedEntry>, Vec<FeedEntry>) =
            feed.entries.into_iter().partition(FeedEntry::has_id);
        if !skipped.is_empty() {
            warn!(feed = %channel.url, count = skipped.len(), "skipping entries without identifier");
        }

        let new_entries = self.remove_old_entries(usable).await?;
        info!(feed = %channel.url, "{} of {} items are new", new_entries.len(), total);

        let report = ChannelReport {
            total,
            skipped_without_id: skipped.len(),
            new: new_entries.len(),
        };

        let items = new_entries
            .into_iter()
            .map(|entry| DispatchedItem::new(&channel.notify, &feed_name, entry))
            .collect();
        self.publish(items).await?;

        Ok(report)
    }

    /// Keep only entries whose identifier the store has never seen.
    ///
    /// Entries sharing an identifier collapse to one; which copy survives
    /// is unspecified.
    async fn remove_old_entries(&self, entries: Vec<FeedEntry>) -> Result<Vec<FeedEntry>, StoreError> {
        let mut by_id: HashMap<String, FeedEntry> = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();

        let ids: HashSet<String> = by_id.keys().cloned().collect();
        let existing = self.store.existing(&ids).await?;

        by_id.retain(|id, _| !existing.get(id).copied().unwrap_or(false));
        Ok(by_id.into_values().collect())
    }

    /// Dispatch every item concurrently and wait for all of them.
    async fn publish(&self, items: Vec<DispatchedItem>) -> Result<(), ChannelError> {
        let total = items.len();
        let failures = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for item in items {
            let dispatcher = Arc::clone(&self.dispatcher);
            let failures = Arc::clone(&failures);
            tasks.spawn(async move {
                let id = item.id.clone();
                if let Err(e) = dispatcher.dispatch(item).await {
                    warn!(id = %id, error = %e, "failed to dispatch item");
                    failures.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "dispatch task did not complete");
                failures.fetch_add(1, Ordering::SeqCst);
            }
        }

        match failures.load(Ordering::SeqCst) {
            0 => Ok(()),
            failed => Err(ChannelError::Dispatch { failed, total }),
        }
    }
}
