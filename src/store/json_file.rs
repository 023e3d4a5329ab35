//! File-backed record store.
//!
//! A collection is a single JSON object on disk mapping entry identifier to
//! [`ProcessedRecord`].  The whole object is held in memory; each upsert
//! rewrites the file through a temp file and a rename, so a crash mid-write
//! leaves the previous version intact.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{merge_into, ProcessedRecord, RecordStore};
use crate::error::StoreError;

/// Record store persisted as one JSON document per collection.
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<HashMap<String, ProcessedRecord>>,
}

impl JsonFileStore {
    /// Open (or lazily create) `<dir>/<collection>.json`.
    pub async fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{collection}.json"));

        let records: HashMap<String, ProcessedRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), records = records.len(), "opened record store");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, id: &str) -> Option<ProcessedRecord> {
        self.records.lock().await.get(id).cloned()
    }

    async fn persist(&self, records: &HashMap<String, ProcessedRecord>) -> Result<(), StoreError> {
        let ordered: BTreeMap<&String, &ProcessedRecord> = records.iter().collect();
        let bytes = serde_json::to_vec_pretty(&ordered)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn existing(&self, ids: &HashSet<String>) -> Result<HashMap<String, bool>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.records.lock().await;
        Ok(ids
            .iter()
            .map(|id| (id.clone(), records.contains_key(id)))
            .collect())
    }

    async fn upsert(&self, record: ProcessedRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;

        // Only commit to memory once the file write went through.
        let mut next = records.clone();
        let id = record.id.clone();
        merge_into(&mut next, record);
        self.persist(&next).await?;
        *records = next;

        debug!(id = %id, path = %self.path.display(), "record updated");
        Ok(())
    }
}
