use async_trait::async_trait;

use super::{Collaborators, Stage};
use crate::task::{Conflict, TaskStage, TaskState};

/// Surfaces evidence a reviewer rejected as a conflict in the final report.
///
/// Existing conflicts are preserved; a record produces at most one conflict.
pub struct ConflictDetectionStage;

#[async_trait]
impl Stage for ConflictDetectionStage {
    async fn apply(&self, mut state: TaskState, _deps: &Collaborators) -> TaskState {
        state.current_stage = TaskStage::DetectingConflicts;

        let fresh: Vec<Conflict> = state
            .verified_data()
            .iter()
            .filter(|r| r.is_rejected())
            .filter(|r| {
                !state
                    .detected_conflicts
                    .iter()
                    .any(|c| c.conflict_id == r.id)
            })
            .map(|r| Conflict {
                conflict_id: r.id.clone(),
                conflict_type: "rejected_source".to_string(),
                details: match &r.review_notes {
                    Some(notes) => format!("{} ({}) rejected by reviewer: {}", r.title, r.url, notes),
                    None => format!("{} ({}) rejected by reviewer", r.title, r.url),
                },
                sources_involved: vec![r.url.clone()],
                suggested_resolution: Some("Exclude this source from conclusions".to_string()),
            })
            .collect();

        if !fresh.is_empty() {
            tracing::info!(
                task_id = %state.task_id(),
                new_conflicts = fresh.len(),
                "Detected conflicts"
            );
        }
        state.detected_conflicts.extend(fresh);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Approval, ResearchRecord, TaskId};
    use crate::workflow::testing::{collaborators, ScriptedSearch};

    fn state_with_rejection() -> TaskState {
        let mut state = TaskState::new(TaskId::new(), "t");
        state.extend_research(vec![
            ResearchRecord::new("good", "https://g", "Good", "fine", 0.9),
            ResearchRecord::new("bad", "https://b", "Bad", "wrong", 0.2),
        ]);
        state.promote_unverified();
        let approval = Approval {
            task_id: state.task_id(),
            data_id: "bad".to_string(),
            approved: false,
            notes: Some("outdated".to_string()),
            corrected_content: None,
        };
        state.verified_record_mut("bad").unwrap().apply_review(&approval);
        state
    }

    #[tokio::test]
    async fn test_rejected_record_becomes_conflict() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let out = ConflictDetectionStage.apply(state_with_rejection(), &deps).await;
        assert_eq!(out.current_stage, TaskStage::DetectingConflicts);
        assert_eq!(out.detected_conflicts.len(), 1);
        assert_eq!(out.detected_conflicts[0].conflict_id, "bad");
        assert!(out.detected_conflicts[0].details.contains("outdated"));
    }

    #[tokio::test]
    async fn test_existing_conflicts_preserved_and_not_duplicated() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let mut state = state_with_rejection();
        state.detected_conflicts.push(Conflict {
            conflict_id: "manual".to_string(),
            conflict_type: "date_mismatch".to_string(),
            details: "two dates".to_string(),
            sources_involved: Vec::new(),
            suggested_resolution: None,
        });
        let once = ConflictDetectionStage.apply(state, &deps).await;
        let twice = ConflictDetectionStage.apply(once, &deps).await;
        assert_eq!(twice.detected_conflicts.len(), 2);
        assert_eq!(twice.detected_conflicts[0].conflict_id, "manual");
    }
}
