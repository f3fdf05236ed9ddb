//! Record storage collaborator.
//!
//! Research hits are stored per task in a collection named by the task id.

mod memory;

pub use memory::InMemoryRecordStorage;

use async_trait::async_trait;
use thiserror::Error;

use crate::task::{ResearchRecord, TaskId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage backend is not available")]
    Unavailable,

    #[error("collection {0} not found")]
    CollectionNotFound(TaskId),
}

#[async_trait]
pub trait RecordStorage: Send + Sync {
    fn is_available(&self) -> bool;

    /// Store records that carry a snippet. Returns how many were stored.
    async fn add_records(
        &self,
        task_id: TaskId,
        records: &[ResearchRecord],
        topic: &str,
    ) -> Result<usize, StorageError>;

    async fn count_records(&self, task_id: TaskId) -> Result<usize, StorageError>;

    /// Drop a task's collection. Returns how many records it held.
    async fn clear_collection(&self, task_id: TaskId) -> Result<usize, StorageError>;
}
