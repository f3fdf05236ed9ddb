//! Progress projection for status reporting.
//!
//! Pure function of `(status, stage)`; never stored.

use super::record::TaskStatus;
use super::state::TaskStage;

/// Map a task's status and stage marker onto `[0.0, 1.0]`.
///
/// While running, the stage decides the value; every other status has a
/// fixed point on the scale.
pub fn progress_of(status: TaskStatus, stage: TaskStage) -> f64 {
    match status {
        TaskStatus::Queued => 0.05,
        TaskStatus::AwaitingHumanVerification => 0.4,
        TaskStatus::Resuming => 0.45,
        TaskStatus::Completed => 1.0,
        TaskStatus::Error | TaskStatus::Failed => 0.0,
        TaskStatus::Running => match stage {
            TaskStage::Queued => 0.05,
            TaskStage::Researching => 0.15,
            TaskStage::Verifying => 0.3,
            TaskStage::AwaitingHumanVerification => 0.4,
            TaskStage::ProcessingHumanFeedback | TaskStage::HumanInputNotRequired => 0.5,
            TaskStage::Synthesizing => 0.6,
            TaskStage::DetectingConflicts => 0.75,
            TaskStage::GeneratingDocument => 0.9,
            TaskStage::Completed => 1.0,
            TaskStage::Failed => 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_points() {
        assert_eq!(progress_of(TaskStatus::Queued, TaskStage::Queued), 0.05);
        assert_eq!(progress_of(TaskStatus::Completed, TaskStage::Completed), 1.0);
        assert_eq!(progress_of(TaskStatus::Failed, TaskStage::Synthesizing), 0.0);
    }

    #[test]
    fn test_running_is_monotonic_along_happy_path() {
        let path = [
            TaskStage::Researching,
            TaskStage::Verifying,
            TaskStage::Synthesizing,
            TaskStage::DetectingConflicts,
            TaskStage::GeneratingDocument,
        ];
        let values: Vec<f64> = path
            .iter()
            .map(|s| progress_of(TaskStatus::Running, *s))
            .collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
