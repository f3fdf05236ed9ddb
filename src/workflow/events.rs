//! Structured stage-transition events.
//!
//! The executor emits one event per stage application. Consumers attach an
//! observer callback, an unbounded channel, or both.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::StageId;
use crate::store::now_string;
use crate::task::{TaskId, TaskStage, TaskStatus};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub sequence_no: u64,
    pub timestamp: String,
    pub task_id: TaskId,
    /// Stage that was applied
    pub stage: StageId,
    /// Marker before the stage ran
    pub from: TaskStage,
    /// Marker the stage left behind
    pub to: TaskStage,
    /// Task status after the executor's checkpoint
    pub status: TaskStatus,
}

pub trait StageEventObserver: Send + Sync {
    fn on_event(&self, event: &StageTransition);
}

impl<F> StageEventObserver for F
where
    F: Fn(&StageTransition) + Send + Sync,
{
    fn on_event(&self, event: &StageTransition) {
        self(event);
    }
}

pub type SharedStageEventObserver = Arc<dyn StageEventObserver>;
pub type StageEventSender = mpsc::UnboundedSender<StageTransition>;
pub type StageEventReceiver = mpsc::UnboundedReceiver<StageTransition>;

#[derive(Clone, Default)]
pub struct EventSink {
    observer: Option<SharedStageEventObserver>,
    sender: Option<StageEventSender>,
    sequence: Arc<AtomicU64>,
}

impl EventSink {
    pub fn with_observer(observer: SharedStageEventObserver) -> Self {
        Self {
            observer: Some(observer),
            ..Self::default()
        }
    }

    pub fn with_sender(sender: StageEventSender) -> Self {
        Self {
            sender: Some(sender),
            ..Self::default()
        }
    }

    pub fn observer(mut self, observer: SharedStageEventObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn sender(mut self, sender: StageEventSender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Stamp and publish a transition. Always logged, even with no consumers.
    pub fn emit(
        &self,
        task_id: TaskId,
        stage: StageId,
        from: TaskStage,
        to: TaskStage,
        status: TaskStatus,
    ) {
        let event = StageTransition {
            sequence_no: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: now_string(),
            task_id,
            stage,
            from,
            to,
            status,
        };
        tracing::info!(
            task_id = %event.task_id,
            stage = %event.stage,
            from = %event.from,
            to = %event.to,
            status = %event.status,
            sequence_no = event.sequence_no,
            "Stage transition"
        );
        if let Some(observer) = self.observer.as_ref() {
            observer.on_event(&event);
        }
        if let Some(sender) = self.sender.as_ref() {
            let _ = sender.send(event);
        }
    }
}

pub fn stage_event_channel() -> (StageEventSender, StageEventReceiver) {
    mpsc::unbounded_channel()
}
