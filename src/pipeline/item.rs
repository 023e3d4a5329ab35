//! Item processing: render one entry, deliver it, remember it.

use std::sync::Arc;

use tracing::info;

use super::DispatchedItem;
use crate::error::{ItemError, TransformError};
use crate::markup::{chat_converter, Converter};
use crate::notify::Notifier;
use crate::store::{ProcessedRecord, RecordStore};

/// Longest message the chat webhook accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Renders one dispatched entry, posts it to its webhook and records it.
pub struct ItemProcessor {
    converter: Converter,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn RecordStore>,
}

impl ItemProcessor {
    pub fn new(notifier: Arc<dyn Notifier>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            converter: chat_converter(),
            notifier,
            store,
        }
    }

    /// Transform, deliver, then record the item.
    ///
    /// The record is written only after the webhook accepted the message.
    /// If that write fails the item stays unrecorded and will be sent again
    /// the next time it is processed.
    pub async fn process(&self, item: &DispatchedItem) -> Result<(), ItemError> {
        let text = self.render(item)?;

        self.notifier.notify(&item.notify, &text).await?;

        self.store.upsert(ProcessedRecord::from_item(item)).await?;

        info!(id = %item.id, updated = %item.updated, "record updated");
        Ok(())
    }

    /// The exact text that would be posted for `item`.
    pub fn render(&self, item: &DispatchedItem) -> Result<String, TransformError> {
        let body = self.converter.convert(&item.content)?;
        let text = assemble_message(&item.feed, &item.link, &item.title, &body);
        Ok(truncate_message(text, MAX_MESSAGE_CHARS))
    }
}

/// `"<feed> <link|title>\n\n<body>"`
pub fn assemble_message(feed: &str, link: &str, title: &str, body: &str) -> String {
    format!("{feed} <{link}|{title}>\n\n{body}")
}

/// Cut `text` to its first `max` characters.  No ellipsis.
pub fn truncate_message(mut text: String, max: usize) -> String {
    if let Some((byte_index, _)) = text.char_indices().nth(max) {
        text.truncate(byte_index);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{item, FlakyStore, RecordingNotifier};

    #[test]
    fn assembles_header_then_body() {
        assert_eq!(
            assemble_message("Blog", "https://b/1", "Hello", "body"),
            "Blog <https://b/1|Hello>\n\nbody"
        );
    }

    #[test]
    fn long_messages_are_cut_to_exactly_the_limit() {
        let text = "x".repeat(5000);
        let cut = truncate_message(text, MAX_MESSAGE_CHARS);
        assert_eq!(cut.chars().count(), 4000);
    }

    #[test]
    fn short_messages_are_untouched() {
        let text = "y".repeat(4000);
        assert_eq!(truncate_message(text.clone(), MAX_MESSAGE_CHARS), text);
    }

    #[test]
    fn truncation_never_splits_a_character() {
        let text = "é".repeat(4001);
        let cut = truncate_message(text, MAX_MESSAGE_CHARS);
        assert_eq!(cut.chars().count(), 4000);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn render_converts_and_bounds() {
        let processor = ItemProcessor::new(
            Arc::new(RecordingNotifier::default()),
            Arc::new(MemoryStore::new()),
        );

        let mut long = item("A");
        long.content = format!("<p>{}</p>", "word ".repeat(1000));
        let text = processor.render(&long).unwrap();
        assert_eq!(text.chars().count(), MAX_MESSAGE_CHARS);
        assert!(text.starts_with("Example Feed <https://example.com/A|Title A>\n\nword word"));

        let short = processor.render(&item("B")).unwrap();
        assert_eq!(short, "Example Feed <https://example.com/B|Title B>\n\nBody of *B*");
    }

    #[tokio::test]
    async fn delivers_then_records() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(MemoryStore::new());
        let processor = ItemProcessor::new(notifier.clone(), store.clone());

        processor.process(&item("A")).await.unwrap();

        let messages = notifier.messages.lock().unwrap().clone();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "https://chat.example.com/hook");

        let record = store.get("A").await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Title A"));
        assert_eq!(record.link.as_deref(), Some("https://example.com/A"));
        assert_eq!(record.last_update.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(record.content.as_deref(), Some("<p>Body of <b>A</b></p>"));
    }

    #[tokio::test]
    async fn delivery_failure_writes_no_record() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::new());
        let processor = ItemProcessor::new(notifier, store.clone());

        let err = processor.process(&item("A")).await.unwrap_err();

        assert!(matches!(err, ItemError::Delivery(_)));
        assert!(store.get("A").await.is_none());
    }

    #[tokio::test]
    async fn persistence_failure_leaves_item_eligible_for_redelivery() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(FlakyStore {
            fail_writes: true,
            ..Default::default()
        });
        let processor = ItemProcessor::new(notifier.clone(), store.clone());

        let err = processor.process(&item("A")).await.unwrap_err();
        assert!(matches!(err, ItemError::Store(_)));
        assert!(store.get("A").await.is_none());

        // Same invocation again: notified a second time.
        let _ = processor.process(&item("A")).await;
        assert_eq!(notifier.count(), 2);
    }

    #[tokio::test]
    async fn transform_failure_sends_nothing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let processor = ItemProcessor::new(notifier.clone(), Arc::new(MemoryStore::new()));

        let mut deep = item("A");
        deep.content = "<div>".repeat(crate::markup::MAX_DEPTH + 1);
        let err = processor.process(&deep).await.unwrap_err();

        assert!(matches!(err, ItemError::Transform(_)));
        assert_eq!(notifier.count(), 0);
    }
}
