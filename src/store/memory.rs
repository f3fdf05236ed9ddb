//! In-memory task store (non-persistent).

use super::{now_string, RecordMutation, StoreError, TaskStore};
use crate::task::{TaskId, TaskRecord, TaskStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&record.task_id) {
            return Err(StoreError::AlreadyExists(record.task_id));
        }
        tasks.insert(record.task_id, record);
        Ok(())
    }

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut tasks: Vec<TaskRecord> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(tasks)
    }

    async fn update(&self, id: TaskId, mutate: RecordMutation) -> Result<TaskRecord, StoreError> {
        let mut tasks = self.tasks.write().await;
        let record = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        mutate(record);
        record.updated_at = now_string();
        Ok(record.clone())
    }

    async fn transition(
        &self,
        id: TaskId,
        allowed: &[TaskStatus],
        mutate: RecordMutation,
    ) -> Result<TaskRecord, StoreError> {
        let mut tasks = self.tasks.write().await;
        let record = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !allowed.contains(&record.status) {
            return Err(StoreError::WrongState {
                task_id: id,
                status: record.status,
            });
        }
        mutate(record);
        record.updated_at = now_string();
        Ok(record.clone())
    }
}
