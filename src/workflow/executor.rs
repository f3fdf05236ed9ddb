//! Drives one task through the stage graph.
//!
//! # Algorithm
//! 1. Claim the task (`queued | resuming -> running`) atomically.
//! 2. Start at the graph entry, or at the resume point of the stage that suspended it.
//! 3. For each stage: persist its entering marker, apply it, then checkpoint:
//!    - error message set => `error`, stop
//!    - review requested  => `awaiting_human_verification`, stop (suspend)
//!    - next edge is END  => `completed`, stop
//!    - otherwise persist and continue with the next stage
//!
//! Suspension is a plain return: nothing stays pending once `run` finishes.
//! A panic inside a stage is caught and turns the task `failed`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;

use super::events::EventSink;
use super::graph::{StageGraph, StageId, Transition};
use super::stages::Collaborators;
use crate::store::{StoreError, TaskStore};
use crate::task::{TaskId, TaskStage, TaskState, TaskStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How an executor turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    /// Waiting for human input; `at` is the stage whose result asked for it
    Suspended { at: StageId },
    /// A stage recorded an error message
    Errored { message: String },
    /// Unexpected fault (panic or broken graph)
    Failed { reason: String },
}

pub struct Executor {
    store: Arc<dyn TaskStore>,
    graph: Arc<StageGraph>,
    deps: Collaborators,
    events: EventSink,
}

impl Executor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        graph: Arc<StageGraph>,
        deps: Collaborators,
        events: EventSink,
    ) -> Self {
        Self {
            store,
            graph,
            deps,
            events,
        }
    }

    /// Run the task until it completes, errors, fails, or suspends.
    ///
    /// # Preconditions
    /// The task's status is `queued` or `resuming`; otherwise
    /// `StoreError::WrongState` is returned and nothing changes.
    pub async fn run(&self, task_id: TaskId) -> Result<RunOutcome, ExecutorError> {
        let record = self
            .store
            .transition(
                task_id,
                &[TaskStatus::Queued, TaskStatus::Resuming],
                Box::new(|r| r.status = TaskStatus::Running),
            )
            .await?;

        let mut state = record.state;
        let start = match record.suspended_at {
            Some(at) => {
                tracing::info!(task_id = %task_id, suspended_at = %at, "Resuming task");
                self.graph.resume_point(at, &state)
            }
            None => {
                tracing::info!(task_id = %task_id, topic = %record.topic, "Starting task");
                Ok(Transition::To(self.graph.entry()))
            }
        };
        let origin = record.suspended_at.unwrap_or_else(|| self.graph.entry());
        let mut stage_id = match start {
            Ok(Transition::To(id)) => id,
            Ok(Transition::End) => return self.complete(task_id, origin, state).await,
            Err(e) => {
                return self
                    .fail(task_id, origin, state.current_stage, e.to_string())
                    .await
            }
        };

        loop {
            let handler = match self.graph.stage(stage_id) {
                Ok(handler) => handler,
                Err(e) => {
                    return self
                        .fail(task_id, stage_id, state.current_stage, e.to_string())
                        .await
                }
            };

            let from = state.current_stage;
            state.current_stage = stage_id.entering_marker();
            let entering = state.clone();
            self.store
                .update(
                    task_id,
                    Box::new(move |r| {
                        r.store_state(entering);
                        r.suspended_at = None;
                    }),
                )
                .await?;

            tracing::debug!(task_id = %task_id, stage = %stage_id, "Applying stage");
            let applied = AssertUnwindSafe(handler.apply(state, &self.deps))
                .catch_unwind()
                .await;
            state = match applied {
                Ok(next) => next,
                Err(payload) => {
                    let reason = format!(
                        "Stage '{}' panicked: {}",
                        stage_id,
                        panic_message(payload.as_ref())
                    );
                    return self.fail(task_id, stage_id, from, reason).await;
                }
            };
            let to = state.current_stage;

            if let Some(message) = state.error_message.clone() {
                tracing::warn!(task_id = %task_id, stage = %stage_id, error = %message, "Stage reported an error");
                self.checkpoint(task_id, state, TaskStatus::Error, Some(message.clone()), None)
                    .await?;
                self.events
                    .emit(task_id, stage_id, from, to, TaskStatus::Error);
                return Ok(RunOutcome::Errored { message });
            }

            if state.awaits_human() {
                tracing::info!(
                    task_id = %task_id,
                    stage = %stage_id,
                    data_id = state.verification_request().map(|r| r.data_id.as_str()).unwrap_or_default(),
                    "Suspending for human verification"
                );
                self.checkpoint(
                    task_id,
                    state,
                    TaskStatus::AwaitingHumanVerification,
                    None,
                    Some(stage_id),
                )
                .await?;
                self.events.emit(
                    task_id,
                    stage_id,
                    from,
                    to,
                    TaskStatus::AwaitingHumanVerification,
                );
                return Ok(RunOutcome::Suspended { at: stage_id });
            }

            let next = match self.graph.next(stage_id, &state) {
                Ok(next) => next,
                Err(e) => return self.fail(task_id, stage_id, to, e.to_string()).await,
            };
            match next {
                Transition::To(next_stage) if !self.graph.is_terminal(next) => {
                    self.checkpoint(task_id, state.clone(), TaskStatus::Running, None, None)
                        .await?;
                    self.events
                        .emit(task_id, stage_id, from, to, TaskStatus::Running);
                    stage_id = next_stage;
                }
                _ => return self.complete(task_id, stage_id, state).await,
            }
        }
    }

    async fn checkpoint(
        &self,
        task_id: TaskId,
        state: TaskState,
        status: TaskStatus,
        error_message: Option<String>,
        suspended_at: Option<StageId>,
    ) -> Result<(), ExecutorError> {
        self.store
            .update(
                task_id,
                Box::new(move |r| {
                    r.store_state(state);
                    r.status = status;
                    r.error_message = error_message;
                    r.suspended_at = suspended_at;
                }),
            )
            .await?;
        Ok(())
    }

    async fn complete(
        &self,
        task_id: TaskId,
        last: StageId,
        mut state: TaskState,
    ) -> Result<RunOutcome, ExecutorError> {
        let from = state.current_stage;
        state.current_stage = TaskStage::Completed;
        self.checkpoint(task_id, state, TaskStatus::Completed, None, None)
            .await?;
        self.events
            .emit(task_id, last, from, TaskStage::Completed, TaskStatus::Completed);
        tracing::info!(task_id = %task_id, "Task completed");
        Ok(RunOutcome::Completed)
    }

    /// Mark the task failed. The last persisted state keeps its stage marker.
    async fn fail(
        &self,
        task_id: TaskId,
        stage: StageId,
        from: TaskStage,
        reason: String,
    ) -> Result<RunOutcome, ExecutorError> {
        tracing::error!(task_id = %task_id, stage = %stage, reason = %reason, "Task failed");
        let message = reason.clone();
        self.store
            .update(
                task_id,
                Box::new(move |r| {
                    r.status = TaskStatus::Failed;
                    r.current_stage = TaskStage::Failed;
                    r.state.error_message = Some(message.clone());
                    r.error_message = Some(message);
                    r.suspended_at = None;
                }),
            )
            .await?;
        self.events
            .emit(task_id, stage, from, TaskStage::Failed, TaskStatus::Failed);
        Ok(RunOutcome::Failed { reason })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
