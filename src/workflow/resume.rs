//! Out-of-band resumption of suspended tasks.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use super::executor::{Executor, ExecutorError, RunOutcome};
use crate::store::{StoreError, TaskStore};
use crate::task::{Approval, TaskId, TaskStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResumeError {
    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error("Task {task_id} is not awaiting human verification. Current status: {status}")]
    WrongState { task_id: TaskId, status: TaskStatus },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ResumeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ResumeError::NotFound(id),
            StoreError::WrongState { task_id, status } => ResumeError::WrongState { task_id, status },
            other => ResumeError::Store(other),
        }
    }
}

pub type ResumeHandle = JoinHandle<Result<RunOutcome, ExecutorError>>;

/// Injects human feedback into a suspended task and restarts its executor.
#[derive(Clone)]
pub struct ResumeController {
    store: Arc<dyn TaskStore>,
    executor: Arc<Executor>,
}

impl ResumeController {
    pub fn new(store: Arc<dyn TaskStore>, executor: Arc<Executor>) -> Self {
        Self { store, executor }
    }

    /// Hand `approval` to the task and schedule its executor.
    ///
    /// # Preconditions
    /// The task exists and its status is exactly `awaiting_human_verification`.
    /// The status check and the flip to `resuming` happen under one store lock,
    /// so of two concurrent calls only one succeeds.
    ///
    /// # Postconditions
    /// On success the feedback is stored, status is `resuming`, and the returned
    /// handle tracks the spawned executor turn. On failure nothing is mutated.
    pub async fn resume(
        &self,
        task_id: TaskId,
        approval: Approval,
    ) -> Result<ResumeHandle, ResumeError> {
        if approval.task_id != task_id {
            tracing::warn!(
                task_id = %task_id,
                approval_task_id = %approval.task_id,
                "Approval names a different task; applying to the route task"
            );
        }
        let data_id = approval.data_id.clone();

        self.store
            .transition(
                task_id,
                &[TaskStatus::AwaitingHumanVerification],
                Box::new(move |r| {
                    r.state.inject_feedback(approval);
                    r.status = TaskStatus::Resuming;
                }),
            )
            .await?;
        tracing::info!(task_id = %task_id, data_id = %data_id, "Human feedback accepted; resuming");

        let executor = Arc::clone(&self.executor);
        Ok(tokio::spawn(async move {
            let outcome = executor.run(task_id).await;
            if let Err(e) = &outcome {
                tracing::error!(task_id = %task_id, error = %e, "Resumed run could not start");
            }
            outcome
        }))
    }
}
