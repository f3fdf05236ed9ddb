//! Task storage with a pluggable backend.
//!
//! The store is the single source of truth for task lifecycle. Readers always
//! get an owned clone of a complete record; writers mutate under the store's
//! lock, so a status query never observes a half-written record.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent)

mod memory;

pub use memory::InMemoryTaskStore;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::task::{TaskId, TaskRecord, TaskStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error("Task {0} already exists")]
    AlreadyExists(TaskId),

    #[error("Task {task_id} is in state '{status}'")]
    WrongState { task_id: TaskId, status: TaskStatus },
}

/// In-place edit applied to a record while the store holds its lock.
pub type RecordMutation = Box<dyn FnOnce(&mut TaskRecord) + Send>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new record. Fails if the id is taken.
    async fn insert(&self, record: TaskRecord) -> Result<(), StoreError>;

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError>;

    /// All records, most recently updated first.
    async fn list(&self) -> Result<Vec<TaskRecord>, StoreError>;

    /// Apply `mutate` and bump `updated_at`. Returns the record as stored.
    async fn update(&self, id: TaskId, mutate: RecordMutation) -> Result<TaskRecord, StoreError>;

    /// Atomic check-and-set on status.
    ///
    /// # Preconditions
    /// The record's status is one of `allowed`; otherwise nothing is mutated and
    /// `StoreError::WrongState` reports the observed status.
    async fn transition(
        &self,
        id: TaskId,
        allowed: &[TaskStatus],
        mutate: RecordMutation,
    ) -> Result<TaskRecord, StoreError>;
}

pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}
