//! In-memory record collections (non-persistent).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{RecordStorage, StorageError};
use crate::task::{ResearchRecord, TaskId};

#[derive(Debug, Clone)]
struct StoredRecord {
    record: ResearchRecord,
    topic: String,
}

#[derive(Clone, Default)]
pub struct InMemoryRecordStorage {
    collections: Arc<RwLock<HashMap<TaskId, Vec<StoredRecord>>>>,
}

impl InMemoryRecordStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topics recorded alongside a task's records.
    pub async fn topics(&self, task_id: TaskId) -> Vec<String> {
        self.collections
            .read()
            .await
            .get(&task_id)
            .map(|items| items.iter().map(|s| s.topic.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStorage for InMemoryRecordStorage {
    fn is_available(&self) -> bool {
        true
    }

    async fn add_records(
        &self,
        task_id: TaskId,
        records: &[ResearchRecord],
        topic: &str,
    ) -> Result<usize, StorageError> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(task_id).or_default();
        let mut stored = 0;
        for record in records.iter().filter(|r| !r.snippet.trim().is_empty()) {
            let entry = StoredRecord {
                record: record.clone(),
                topic: topic.to_string(),
            };
            match collection.iter_mut().find(|s| s.record.id == record.id) {
                Some(existing) => *existing = entry,
                None => collection.push(entry),
            }
            stored += 1;
        }
        tracing::debug!(task_id = %task_id, stored, "Stored research records");
        Ok(stored)
    }

    async fn count_records(&self, task_id: TaskId) -> Result<usize, StorageError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&task_id)
            .map(Vec::len)
            .unwrap_or(0))
    }

    async fn clear_collection(&self, task_id: TaskId) -> Result<usize, StorageError> {
        self.collections
            .write()
            .await
            .remove(&task_id)
            .map(|items| items.len())
            .ok_or(StorageError::CollectionNotFound(task_id))
    }
}
