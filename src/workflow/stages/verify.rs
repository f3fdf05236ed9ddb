use async_trait::async_trait;

use super::{Collaborators, Stage};
use crate::task::{TaskStage, TaskState, VerificationRequest};

/// Promotes research into the verified set and decides whether a human should
/// look at anything first.
///
/// With a `review_threshold`, the first unreviewed record scoring below it is
/// sent for review. A request already on the state is left alone.
pub struct VerifyStage {
    review_threshold: Option<f64>,
}

impl VerifyStage {
    pub fn new(review_threshold: Option<f64>) -> Self {
        Self { review_threshold }
    }

    fn pick_for_review(&self, state: &TaskState) -> Option<VerificationRequest> {
        let threshold = self.review_threshold?;
        state
            .verified_data()
            .iter()
            .find(|r| r.review_status.is_none() && r.score < threshold)
            .map(|r| VerificationRequest {
                task_id: state.task_id(),
                data_id: r.id.clone(),
                data_to_verify: r.preview(),
            })
    }
}

#[async_trait]
impl Stage for VerifyStage {
    async fn apply(&self, mut state: TaskState, _deps: &Collaborators) -> TaskState {
        state.current_stage = TaskStage::Verifying;
        let task_id = state.task_id();

        if state.research_data().is_empty() {
            tracing::warn!(task_id = %task_id, "No research data to verify");
            state.error_message =
                Some("Verification skipped: No research data available.".to_string());
            state.clear_verification();
            return state;
        }

        let promoted = state.promote_unverified();
        tracing::info!(
            task_id = %task_id,
            promoted,
            verified_total = state.verified_data().len(),
            "Verification pass complete"
        );

        if state.verification_request().is_none() {
            if let Some(request) = self.pick_for_review(&state) {
                tracing::info!(
                    task_id = %task_id,
                    data_id = %request.data_id,
                    "Requesting human verification"
                );
                state.request_verification(request);
            }
        }

        if !state.human_in_loop_needed() {
            state.clear_verification();
        } else if state.verification_request().is_none() {
            tracing::warn!(
                task_id = %task_id,
                "Human review flagged but no verification request was built"
            );
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ResearchRecord, ReviewStatus, TaskId};
    use crate::workflow::testing::{collaborators, ScriptedSearch};

    fn researched_state(scores: &[f64]) -> TaskState {
        let mut state = TaskState::new(TaskId::new(), "t");
        state.extend_research(scores.iter().enumerate().map(|(i, score)| {
            ResearchRecord::new(format!("r{i}"), "https://a", "A", "text", *score)
        }));
        state
    }

    #[tokio::test]
    async fn test_empty_research_sets_error() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let out = VerifyStage::new(None)
            .apply(TaskState::new(TaskId::new(), "t"), &deps)
            .await;
        assert_eq!(
            out.error_message.as_deref(),
            Some("Verification skipped: No research data available.")
        );
        assert!(out.verified_data().is_empty());
        assert!(!out.human_in_loop_needed());
    }

    #[tokio::test]
    async fn test_no_threshold_never_requests_review() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let out = VerifyStage::new(None)
            .apply(researched_state(&[0.1, 0.2]), &deps)
            .await;
        assert_eq!(out.verified_data().len(), 2);
        assert!(!out.awaits_human());
    }

    #[tokio::test]
    async fn test_low_score_triggers_review() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let out = VerifyStage::new(Some(0.5))
            .apply(researched_state(&[0.9, 0.3, 0.1]), &deps)
            .await;
        assert!(out.awaits_human());
        assert_eq!(out.verification_request().unwrap().data_id, "r1");
    }

    #[tokio::test]
    async fn test_reviewed_records_not_requested_again() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let stage = VerifyStage::new(Some(0.5));
        let mut state = stage.apply(researched_state(&[0.3]), &deps).await;
        state.clear_verification();
        state.verified_record_mut("r0").unwrap().review_status =
            Some(ReviewStatus::VerifiedByHuman);

        let out = stage.apply(state, &deps).await;
        assert!(!out.awaits_human());
        assert_eq!(
            out.verified_data()[0].review_status,
            Some(ReviewStatus::VerifiedByHuman)
        );
    }

    #[tokio::test]
    async fn test_flag_without_request_left_for_routing() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let mut state = researched_state(&[0.9]);
        state.flag_human_review();
        let out = VerifyStage::new(None).apply(state, &deps).await;
        assert!(out.human_in_loop_needed());
        assert!(out.verification_request().is_none());
        assert!(out.error_message.is_none());
    }
}
