//! Per-task working state threaded through every stage of the research graph.
//!
//! # Invariants
//! - `topic` and `task_id` never change after construction
//! - A pending verification request implies the HITL flag is raised
//!   (the converse may be violated, see [`TaskState::flag_human_review`])
//! - `sources_explored` and `data_collected` never decrease
//! - `research_data` and `verified_data` only grow; verified entries are
//!   updated in place by human review, never removed

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a research task.
///
/// Doubles as the collection key for the storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a fresh task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a task currently is, as reported to observers.
///
/// Stages overwrite this with their own marker on entry, so a crash
/// mid-stage still leaves the last stage that started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    Queued,
    Researching,
    Verifying,
    AwaitingHumanVerification,
    ProcessingHumanFeedback,
    HumanInputNotRequired,
    Synthesizing,
    DetectingConflicts,
    GeneratingDocument,
    Completed,
    Failed,
}

impl TaskStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStage::Queued => "queued",
            TaskStage::Researching => "researching",
            TaskStage::Verifying => "verifying",
            TaskStage::AwaitingHumanVerification => "awaiting_human_verification",
            TaskStage::ProcessingHumanFeedback => "processing_human_feedback",
            TaskStage::HumanInputNotRequired => "human_input_not_required",
            TaskStage::Synthesizing => "synthesizing",
            TaskStage::DetectingConflicts => "detecting_conflicts",
            TaskStage::GeneratingDocument => "generating_document",
            TaskStage::Completed => "completed",
            TaskStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a human review on a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    VerifiedByHuman,
    RejectedByHuman,
}

/// A single piece of collected evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<ReviewStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(default)]
    pub corrected_by_human: bool,
}

impl ResearchRecord {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
            raw_content: None,
            score,
            source_name: None,
            review_status: None,
            review_notes: None,
            corrected_by_human: false,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.review_status == Some(ReviewStatus::RejectedByHuman)
    }

    /// Apply a human decision to this record.
    ///
    /// # Postconditions
    /// - `approved` => `review_status == VerifiedByHuman`; corrected content, when
    ///   given, replaces `snippet` and `raw_content`
    /// - `!approved` => `review_status == RejectedByHuman`, content untouched
    pub fn apply_review(&mut self, approval: &Approval) {
        if approval.approved {
            self.review_status = Some(ReviewStatus::VerifiedByHuman);
            self.review_notes = approval.notes.clone();
            if let Some(corrected) = &approval.corrected_content {
                self.snippet = corrected.clone();
                self.raw_content = Some(corrected.clone());
                self.corrected_by_human = true;
            }
        } else {
            self.review_status = Some(ReviewStatus::RejectedByHuman);
            self.review_notes = approval.notes.clone();
        }
    }

    /// Short preview shown to the human reviewer.
    pub fn preview(&self) -> DataPreview {
        let content = self.raw_content.as_deref().unwrap_or(&self.snippet);
        DataPreview {
            id: self.id.clone(),
            url: self.url.clone(),
            content_preview: content.chars().take(500).collect(),
        }
    }
}

/// Reviewer-facing excerpt of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPreview {
    pub id: String,
    pub url: String,
    pub content_preview: String,
}

/// A request for a human to confirm or reject one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub task_id: TaskId,
    pub data_id: String,
    pub data_to_verify: DataPreview,
}

/// Human decision injected on resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub task_id: TaskId,
    pub data_id: String,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_content: Option<String>,
}

/// A contradiction or quality problem surfaced by conflict detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: String,
    #[serde(rename = "type")]
    pub conflict_type: String,
    pub details: String,
    #[serde(default)]
    pub sources_involved: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_resolution: Option<String>,
}

/// The working record for one task.
///
/// Owned by exactly one executor turn at a time. The executor hands it to each
/// stage by value and persists whatever comes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    task_id: TaskId,
    topic: String,
    pub current_stage: TaskStage,
    research_data: Vec<ResearchRecord>,
    verified_data: Vec<ResearchRecord>,
    pub synthesized_content: String,
    pub final_document: String,
    pub detected_conflicts: Vec<Conflict>,
    human_in_loop_needed: bool,
    current_verification_request: Option<VerificationRequest>,
    human_feedback: Option<Approval>,
    pub error_message: Option<String>,
    sources_explored: u64,
    data_collected: u64,
}

impl TaskState {
    /// Create the initial state for a newly submitted task.
    ///
    /// # Postconditions
    /// - `current_stage == Queued`
    /// - all collections empty, counters zero, no HITL flags
    pub fn new(task_id: TaskId, topic: impl Into<String>) -> Self {
        Self {
            task_id,
            topic: topic.into(),
            current_stage: TaskStage::Queued,
            research_data: Vec::new(),
            verified_data: Vec::new(),
            synthesized_content: String::new(),
            final_document: String::new(),
            detected_conflicts: Vec::new(),
            human_in_loop_needed: false,
            current_verification_request: None,
            human_feedback: None,
            error_message: None,
            sources_explored: 0,
            data_collected: 0,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn research_data(&self) -> &[ResearchRecord] {
        &self.research_data
    }

    pub fn verified_data(&self) -> &[ResearchRecord] {
        &self.verified_data
    }

    pub fn sources_explored(&self) -> u64 {
        self.sources_explored
    }

    pub fn data_collected(&self) -> u64 {
        self.data_collected
    }

    pub fn human_in_loop_needed(&self) -> bool {
        self.human_in_loop_needed
    }

    pub fn verification_request(&self) -> Option<&VerificationRequest> {
        self.current_verification_request.as_ref()
    }

    pub fn human_feedback(&self) -> Option<&Approval> {
        self.human_feedback.as_ref()
    }

    /// True when the state both asks for and describes a human review.
    pub fn awaits_human(&self) -> bool {
        self.human_in_loop_needed && self.current_verification_request.is_some()
    }

    /// Append freshly collected records.
    ///
    /// # Postconditions
    /// `data_collected >= research_data.len()`
    pub fn extend_research(&mut self, records: impl IntoIterator<Item = ResearchRecord>) {
        self.research_data.extend(records);
        self.data_collected = self.data_collected.max(self.research_data.len() as u64);
    }

    pub fn add_sources_explored(&mut self, count: u64) {
        self.sources_explored = self.sources_explored.saturating_add(count);
    }

    /// Copy research records into the verified set, skipping ids already present.
    ///
    /// Returns how many records were appended.
    pub fn promote_unverified(&mut self) -> usize {
        let fresh: Vec<ResearchRecord> = self
            .research_data
            .iter()
            .filter(|r| !self.verified_data.iter().any(|v| v.id == r.id))
            .cloned()
            .collect();
        let added = fresh.len();
        self.verified_data.extend(fresh);
        added
    }

    pub fn verified_record_mut(&mut self, data_id: &str) -> Option<&mut ResearchRecord> {
        self.verified_data.iter_mut().find(|r| r.id == data_id)
    }

    /// Raise the HITL flag together with the request describing what to review.
    pub fn request_verification(&mut self, request: VerificationRequest) {
        self.human_in_loop_needed = true;
        self.current_verification_request = Some(request);
    }

    /// Raise the HITL flag without a request.
    ///
    /// Such a state is not suspendable; routing proceeds to synthesis and logs a warning.
    pub fn flag_human_review(&mut self) {
        self.human_in_loop_needed = true;
    }

    /// Drop the HITL flag and any pending request.
    pub fn clear_verification(&mut self) {
        self.human_in_loop_needed = false;
        self.current_verification_request = None;
    }

    /// Store a human decision. Only the resume path calls this.
    pub(crate) fn inject_feedback(&mut self, approval: Approval) {
        self.human_feedback = Some(approval);
    }

    /// Consume the pending human decision, if any.
    pub fn take_feedback(&mut self) -> Option<Approval> {
        self.human_feedback.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ResearchRecord {
        ResearchRecord::new(id, format!("https://example.com/{id}"), id, "snippet", 0.9)
    }

    #[test]
    fn test_new_state_is_queued_and_empty() {
        let state = TaskState::new(TaskId::new(), "rust async");
        assert_eq!(state.current_stage, TaskStage::Queued);
        assert!(state.research_data().is_empty());
        assert!(!state.human_in_loop_needed());
        assert!(state.verification_request().is_none());
        assert_eq!(state.sources_explored(), 0);
    }

    #[test]
    fn test_promote_skips_existing_ids() {
        let mut state = TaskState::new(TaskId::new(), "t");
        state.extend_research(vec![record("a"), record("b")]);
        assert_eq!(state.promote_unverified(), 2);

        state.verified_record_mut("a").unwrap().review_status = Some(ReviewStatus::VerifiedByHuman);
        state.extend_research(vec![record("c")]);
        assert_eq!(state.promote_unverified(), 1);
        assert_eq!(state.verified_data().len(), 3);
        assert_eq!(
            state.verified_data()[0].review_status,
            Some(ReviewStatus::VerifiedByHuman)
        );
    }

    #[test]
    fn test_data_collected_never_decreases() {
        let mut state = TaskState::new(TaskId::new(), "t");
        state.extend_research(vec![record("a"), record("b")]);
        assert_eq!(state.data_collected(), 2);
        state.extend_research(Vec::new());
        assert_eq!(state.data_collected(), 2);
    }

    #[test]
    fn test_request_and_clear_verification() {
        let id = TaskId::new();
        let mut state = TaskState::new(id, "t");
        let rec = record("x");
        state.request_verification(VerificationRequest {
            task_id: id,
            data_id: rec.id.clone(),
            data_to_verify: rec.preview(),
        });
        assert!(state.awaits_human());

        state.clear_verification();
        assert!(!state.human_in_loop_needed());
        assert!(state.verification_request().is_none());
    }

    #[test]
    fn test_flag_without_request_is_not_suspendable() {
        let mut state = TaskState::new(TaskId::new(), "t");
        state.flag_human_review();
        assert!(state.human_in_loop_needed());
        assert!(!state.awaits_human());
    }

    #[test]
    fn test_apply_review_with_correction() {
        let mut rec = record("x");
        rec.apply_review(&Approval {
            task_id: TaskId::new(),
            data_id: "x".to_string(),
            approved: true,
            notes: Some("looks right".to_string()),
            corrected_content: Some("fixed text".to_string()),
        });
        assert_eq!(rec.review_status, Some(ReviewStatus::VerifiedByHuman));
        assert_eq!(rec.snippet, "fixed text");
        assert_eq!(rec.raw_content.as_deref(), Some("fixed text"));
        assert!(rec.corrected_by_human);
    }

    #[test]
    fn test_apply_review_rejection_keeps_content() {
        let mut rec = record("x");
        rec.apply_review(&Approval {
            task_id: TaskId::new(),
            data_id: "x".to_string(),
            approved: false,
            notes: None,
            corrected_content: Some("ignored".to_string()),
        });
        assert!(rec.is_rejected());
        assert_eq!(rec.snippet, "snippet");
        assert!(!rec.corrected_by_human);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStage::AwaitingHumanVerification).unwrap();
        assert_eq!(json, "\"awaiting_human_verification\"");
    }
}
