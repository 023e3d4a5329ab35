//! Processed-record storage.
//!
//! The [`RecordStore`] trait is the only thing the processors see.  It has
//! two jobs: tell the channel processor which entries were already notified
//! ([`existing`](RecordStore::existing)) and let the item processor mark an
//! entry as notified ([`upsert`](RecordStore::upsert)).
//!
//! Two implementations ship with the crate:
//!
//! * [`MemoryStore`]: a `HashMap`, lost on restart.
//! * [`JsonFileStore`]: one JSON document per collection on disk.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::pipeline::DispatchedItem;

/// Durable proof that an entry was delivered.
///
/// Every field except `id` is optional: a `None` field in a write leaves the
/// stored value untouched (see [`ProcessedRecord::merge`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ProcessedRecord {
    /// A complete record for a delivered item.
    pub fn from_item(item: &DispatchedItem) -> Self {
        Self {
            id: item.id.clone(),
            last_update: Some(item.updated.clone()),
            title: Some(item.title.clone()),
            content: Some(item.content.clone()),
            link: Some(item.link.clone()),
        }
    }

    /// Apply a partial write on top of `self`.
    pub fn merge(&mut self, patch: ProcessedRecord) {
        if patch.last_update.is_some() {
            self.last_update = patch.last_update;
        }
        if patch.title.is_some() {
            self.title = patch.title;
        }
        if patch.content.is_some() {
            self.content = patch.content;
        }
        if patch.link.is_some() {
            self.link = patch.link;
        }
    }
}

/// Document store keyed by entry identifier.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Batch existence check.  The result has one key per requested id.
    async fn existing(&self, ids: &HashSet<String>) -> Result<HashMap<String, bool>, StoreError>;

    /// Merge-write a record; unspecified fields keep their stored value.
    async fn upsert(&self, record: ProcessedRecord) -> Result<(), StoreError>;
}

/// Shared merge logic for map-backed stores.
fn merge_into(map: &mut HashMap<String, ProcessedRecord>, record: ProcessedRecord) {
    match map.get_mut(&record.id) {
        Some(stored) => stored.merge(record),
        None => {
            map.insert(record.id.clone(), record);
        }
    }
}
