//! Test doubles shared by the pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::{DeliveryError, DispatchError, SourceError, StoreError};
use crate::notify::Notifier;
use crate::pipeline::{Dispatch, DispatchedItem};
use crate::source::{FeedEntry, FeedSource, ParsedFeed};
use crate::store::{MemoryStore, ProcessedRecord, RecordStore};

pub fn entry(id: &str) -> FeedEntry {
    FeedEntry {
        id: id.to_string(),
        title: format!("Title {id}"),
        link: format!("https://example.com/{id}"),
        content: format!("<p>Body of <b>{id}</b></p>"),
        updated: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn item(id: &str) -> DispatchedItem {
    DispatchedItem::new("https://chat.example.com/hook", "Example Feed", entry(id))
}

/// Records every dispatched item; fails the ids it was told to.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<DispatchedItem>>,
    pub fail_ids: HashSet<String>,
}

impl RecordingDispatcher {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            sent: Mutex::default(),
            fail_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn sent_ids(&self) -> HashSet<String> {
        self.sent.lock().unwrap().iter().map(|i| i.id.clone()).collect()
    }
}

#[async_trait]
impl Dispatch for RecordingDispatcher {
    async fn dispatch(&self, item: DispatchedItem) -> Result<(), DispatchError> {
        if self.fail_ids.contains(&item.id) {
            return Err(DispatchError::Closed);
        }
        self.sent.lock().unwrap().push(item);
        Ok(())
    }
}

/// A memory store whose operations can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub reads: AtomicUsize,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn existing(&self, ids: &HashSet<String>) -> Result<HashMap<String, bool>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(StoreError::Io(std::io::Error::other("read refused")));
        }
        self.inner.existing(ids).await
    }

    async fn upsert(&self, record: ProcessedRecord) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Io(std::io::Error::other("write refused")));
        }
        self.inner.upsert(record).await
    }
}

impl FlakyStore {
    pub async fn get(&self, id: &str) -> Option<ProcessedRecord> {
        self.inner.get(id).await
    }
}

/// Collects messages instead of posting them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, url: &str, text: &str) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Status {
                status: 500,
                body: "internal".into(),
            });
        }
        self.messages
            .lock()
            .unwrap()
            .push((url.to_string(), text.to_string()));
        Ok(())
    }
}

/// Serves a fixed feed, or a fixed error.
pub struct StaticSource {
    pub feed: Option<ParsedFeed>,
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, SourceError> {
        self.feed.clone().ok_or_else(|| SourceError::Parse {
            url: url.to_string(),
            reason: "unreadable".into(),
        })
    }
}

/// Answers exactly one HTTP request with `status` and `body`.
///
/// Returns the URL to hit and a handle resolving to the raw request body.
pub async fn one_shot_server(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);

        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status} Status\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string()
    });

    (format!("http://{addr}/hook"), handle)
}
