use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{merge_into, ProcessedRecord, RecordStore};
use crate::error::StoreError;

/// In-process record store.  Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ProcessedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, id: &str) -> Option<ProcessedRecord> {
        self.records.read().await.get(id).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn existing(&self, ids: &HashSet<String>) -> Result<HashMap<String, bool>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.records.read().await;
        Ok(ids
            .iter()
            .map(|id| (id.clone(), records.contains_key(id)))
            .collect())
    }

    async fn upsert(&self, record: ProcessedRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        merge_into(&mut records, record);
        Ok(())
    }
}
