//! Externally visible control block for a task.

use serde::{Deserialize, Serialize};

use super::state::{TaskId, TaskStage, TaskState};
use crate::workflow::StageId;

/// Lifecycle status of a task.
///
/// # State Machine
/// ```text
/// Queued -> Running -> Completed
///                  \-> Error
///                  \-> Failed
///                  \-> AwaitingHumanVerification -> Resuming -> Running
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    AwaitingHumanVerification,
    Resuming,
    Completed,
    /// A stage recorded an error message
    Error,
    /// The executor caught an unexpected fault
    Failed,
}

impl TaskStatus {
    /// `true` if no further execution will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::Failed
        )
    }

    /// `true` if an executor may claim the task.
    pub fn is_runnable(&self) -> bool {
        matches!(self, TaskStatus::Queued | TaskStatus::Resuming)
    }

    /// `true` if the task finished without producing a usable result.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, TaskStatus::Error | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::AwaitingHumanVerification => "awaiting_human_verification",
            TaskStatus::Resuming => "resuming",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as held by the store.
///
/// # Invariants
/// - `task_id == state.task_id()` and `topic == state.topic()`
/// - `suspended_at.is_some()` only while awaiting or resuming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub topic: String,
    pub status: TaskStatus,
    pub current_stage: TaskStage,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Stage whose result suspended the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended_at: Option<StageId>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRecord {
    /// Create a queued record for a new task.
    pub fn new(task_id: TaskId, topic: impl Into<String>, now: String) -> Self {
        let topic = topic.into();
        Self {
            task_id,
            state: TaskState::new(task_id, topic.clone()),
            topic,
            status: TaskStatus::Queued,
            current_stage: TaskStage::Queued,
            error_message: None,
            suspended_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Replace the stored state wholesale, mirroring its stage marker.
    pub fn store_state(&mut self, state: TaskState) {
        self.current_stage = state.current_stage;
        self.state = state;
    }
}
