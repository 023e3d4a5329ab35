//! In-process transport between the channel and item processors.
//!
//! [`QueueDispatcher`] pushes items onto a bounded tokio channel;
//! [`ItemWorker`] drains it, running one task per item.  A failed item is
//! redelivered a few times before it is given up on, so the item processor
//! sees at-least-once delivery just as it would behind a real message bus.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::DispatchError;
use crate::pipeline::{Dispatch, DispatchedItem, ItemProcessor};

/// Create a queue holding at most `capacity` undelivered items.
pub fn queue(capacity: usize) -> (QueueDispatcher, mpsc::Receiver<DispatchedItem>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueDispatcher { tx }, rx)
}

/// [`Dispatch`] onto the bounded in-process queue.
#[derive(Clone)]
pub struct QueueDispatcher {
    tx: mpsc::Sender<DispatchedItem>,
}

#[async_trait]
impl Dispatch for QueueDispatcher {
    async fn dispatch(&self, item: DispatchedItem) -> Result<(), DispatchError> {
        let id = item.id.clone();
        self.tx.send(item).await.map_err(|_| DispatchError::Closed)?;
        debug!(id = %id, "item queued");
        Ok(())
    }
}

/// Totals for one worker lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: usize,
    pub failed: usize,
}

/// Consumes the queue and runs every item through the [`ItemProcessor`].
pub struct ItemWorker {
    processor: Arc<ItemProcessor>,
    max_attempts: u32,
    backoff: Duration,
}

impl ItemWorker {
    pub fn new(processor: Arc<ItemProcessor>, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            processor,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Process items until every sender is dropped, then wait for the
    /// in-flight ones.
    pub async fn run(self, mut rx: mpsc::Receiver<DispatchedItem>) -> WorkerStats {
        let mut stats = WorkerStats::default();
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(item) => {
                        tasks.spawn(deliver(
                            Arc::clone(&self.processor),
                            item,
                            self.max_attempts,
                            self.backoff,
                        ));
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    tally(&mut stats, joined);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            tally(&mut stats, joined);
        }

        stats
    }
}

fn tally(stats: &mut WorkerStats, joined: Result<bool, tokio::task::JoinError>) {
    match joined {
        Ok(true) => stats.delivered += 1,
        Ok(false) => stats.failed += 1,
        Err(e) => {
            error!(error = %e, "item task did not complete");
            stats.failed += 1;
        }
    }
}

async fn deliver(
    processor: Arc<ItemProcessor>,
    item: DispatchedItem,
    max_attempts: u32,
    backoff: Duration,
) -> bool {
    for attempt in 1..=max_attempts {
        match processor.process(&item).await {
            Ok(()) => return true,
            Err(e) if attempt < max_attempts => {
                warn!(id = %item.id, attempt, error = %e, "item failed, redelivering");
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(e) => {
                error!(id = %item.id, attempts = attempt, error = %e, "giving up on item");
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{item, RecordingNotifier};

    #[tokio::test]
    async fn dispatch_fails_once_queue_is_closed() {
        let (dispatcher, rx) = queue(4);
        drop(rx);

        let err = dispatcher.dispatch(item("A")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Closed));
    }

    #[tokio::test]
    async fn worker_delivers_queued_items_and_drains_on_close() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(MemoryStore::new());
        let processor = Arc::new(ItemProcessor::new(notifier.clone(), store.clone()));

        let (dispatcher, rx) = queue(8);
        let worker = tokio::spawn(ItemWorker::new(processor, 3, Duration::ZERO).run(rx));

        dispatcher.dispatch(item("A")).await.unwrap();
        dispatcher.dispatch(item("B")).await.unwrap();
        drop(dispatcher);

        let stats = worker.await.unwrap();
        assert_eq!(stats, WorkerStats { delivered: 2, failed: 0 });
        assert_eq!(notifier.count(), 2);
        assert!(store.get("A").await.is_some());
    }

    #[tokio::test]
    async fn failing_item_is_retried_then_given_up() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::new());
        let processor = Arc::new(ItemProcessor::new(notifier, store.clone()));

        let (dispatcher, rx) = queue(8);
        let worker = tokio::spawn(ItemWorker::new(processor, 2, Duration::ZERO).run(rx));

        dispatcher.dispatch(item("A")).await.unwrap();
        drop(dispatcher);

        let stats = worker.await.unwrap();
        assert_eq!(stats, WorkerStats { delivered: 0, failed: 1 });
        assert!(store.get("A").await.is_none());
    }
}
