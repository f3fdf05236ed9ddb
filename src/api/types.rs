//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::task::{
    progress_of, Approval, Conflict, TaskId, TaskRecord, TaskStage, TaskStatus,
    VerificationRequest,
};

/// Request to start a new research task.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchRequest {
    /// Subject to research
    pub topic: String,
}

/// Snapshot of a task as reported to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchStatus {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub current_stage: TaskStage,
    pub message: String,

    /// Derived on every query (0.0 - 1.0)
    pub progress: f64,

    pub sources_explored: u64,
    pub data_collected: u64,

    /// RFC 3339 time of the last record update
    pub timestamp: String,

    /// Present only while the task waits for a reviewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_request: Option<VerificationRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResearchStatus {
    pub fn from_record(record: &TaskRecord) -> Self {
        let verification_request = if record.status == TaskStatus::AwaitingHumanVerification {
            record.state.verification_request().cloned()
        } else {
            None
        };

        Self {
            task_id: record.task_id,
            status: record.status,
            current_stage: record.current_stage,
            message: status_message(record),
            progress: progress_of(record.status, record.current_stage),
            sources_explored: record.state.sources_explored(),
            data_collected: record.state.data_collected(),
            timestamp: record.updated_at.clone(),
            verification_request,
            error_message: record.error_message.clone(),
        }
    }
}

/// Human-readable summary of where a task stands.
pub fn status_message(record: &TaskRecord) -> String {
    match record.status {
        TaskStatus::Queued => format!("Research task for topic '{}' has been queued.", record.topic),
        TaskStatus::Completed => format!("Research completed for topic: {}", record.topic),
        TaskStatus::AwaitingHumanVerification => format!(
            "Awaiting human verification for topic: {}",
            record.topic
        ),
        TaskStatus::Error | TaskStatus::Failed => match record.error_message.as_deref() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => format!(
                "Research failed for topic: {}. No specific error message.",
                record.topic
            ),
        },
        TaskStatus::Running | TaskStatus::Resuming => {
            format!("Current status for topic: {}", record.topic)
        }
    }
}

/// Reviewer decision as posted to the verification endpoint.
///
/// The route names the task; a body `task_id` is optional and only checked.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSubmission {
    #[serde(default)]
    pub task_id: Option<TaskId>,
    pub data_id: String,
    pub approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub corrected_content: Option<String>,
}

impl VerificationSubmission {
    pub fn into_approval(self, route_task_id: TaskId) -> Approval {
        Approval {
            task_id: self.task_id.unwrap_or(route_task_id),
            data_id: self.data_id,
            approved: self.approved,
            notes: self.notes,
            corrected_content: self.corrected_content,
        }
    }
}

/// Acknowledgement of an accepted verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationAccepted {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub message: String,
}

/// Final report of a completed task.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutput {
    pub task_id: TaskId,
    pub document_content: String,
    /// Always "markdown"
    pub format: String,
    pub conflicts: Vec<Conflict>,
}

impl DocumentOutput {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            document_content: record.state.final_document.clone(),
            format: "markdown".to_string(),
            conflicts: record.state.detected_conflicts.clone(),
        }
    }
}

/// Returned by the results endpoint while a task is still in flight.
#[derive(Debug, Clone, Serialize)]
pub struct PendingResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub detail: String,
}

/// One row of the task listing.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub topic: String,
    pub status: TaskStatus,
    pub current_stage: TaskStage,
    pub progress: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            topic: record.topic.clone(),
            status: record.status,
            current_stage: record.current_stage,
            progress: progress_of(record.status, record.current_stage),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Whether a language model is configured
    pub llm_available: bool,

    /// Name of the active search provider
    pub search_provider: String,
}
