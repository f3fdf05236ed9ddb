//! Stage contract and the handlers of the research pipeline.
//!
//! Every stage is a total function `(TaskState, &Collaborators) -> TaskState`:
//! it sets its own stage marker before doing work and records expected
//! failures in `error_message` instead of returning an error.

mod conflicts;
mod document;
mod human_input;
mod research;
mod synthesize;
mod verify;

pub use conflicts::ConflictDetectionStage;
pub use document::DocumentStage;
pub use human_input::HumanInputStage;
pub use research::ResearchStage;
pub use synthesize::SynthesisStage;
pub use verify::VerifyStage;

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::LanguageModel;
use crate::search::SearchProvider;
use crate::storage::RecordStorage;
use crate::task::TaskState;

/// External services handed to every stage.
#[derive(Clone)]
pub struct Collaborators {
    pub search: Arc<dyn SearchProvider>,
    pub storage: Arc<dyn RecordStorage>,
    pub llm: Arc<dyn LanguageModel>,
    /// How many hits the research stage asks for
    pub num_search_results: usize,
}

#[async_trait]
pub trait Stage: Send + Sync {
    async fn apply(&self, state: TaskState, deps: &Collaborators) -> TaskState;
}

pub type SharedStage = Arc<dyn Stage>;

/// Append `message` to whatever error the state already carries.
fn append_error(state: &mut TaskState, message: impl Into<String>) {
    let message = message.into();
    state.error_message = Some(match state.error_message.take() {
        Some(existing) if !existing.is_empty() => format!("{} {}", existing, message),
        _ => message,
    });
}
