use async_trait::async_trait;

use super::{Collaborators, Stage};
use crate::task::{TaskStage, TaskState};

/// The suspend/resume node.
///
/// On first arrival it only marks the state as awaiting; once the resume path
/// has injected feedback it applies the decision to the matching verified record.
pub struct HumanInputStage;

#[async_trait]
impl Stage for HumanInputStage {
    async fn apply(&self, mut state: TaskState, _deps: &Collaborators) -> TaskState {
        let task_id = state.task_id();

        if let Some(approval) = state.take_feedback() {
            state.current_stage = TaskStage::ProcessingHumanFeedback;
            match state.verified_record_mut(&approval.data_id) {
                Some(record) => {
                    record.apply_review(&approval);
                    tracing::info!(
                        task_id = %task_id,
                        data_id = %approval.data_id,
                        approved = approval.approved,
                        corrected = approval.corrected_content.is_some(),
                        "Applied human review"
                    );
                }
                None => tracing::warn!(
                    task_id = %task_id,
                    data_id = %approval.data_id,
                    "Human feedback refers to an unknown record"
                ),
            }
            state.clear_verification();
            return state;
        }

        if state.human_in_loop_needed() {
            state.current_stage = TaskStage::AwaitingHumanVerification;
            tracing::debug!(task_id = %task_id, "Awaiting human verification");
            return state;
        }

        state.current_stage = TaskStage::HumanInputNotRequired;
        state.clear_verification();
        state
    }
}
