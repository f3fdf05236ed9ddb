//! Stage-graph execution engine.
//!
//! ## Architecture
//!
//! ```text
//!   submit ──► TaskStore ◄──────── status queries
//!                 ▲   ▲
//!        persist  │   │ check-and-set
//!                 │   │
//!            Executor ◄── ResumeController ◄── human feedback
//!                 │
//!                 ▼
//!            StageGraph ──► Stage handlers ──► Collaborators
//! ```
//!
//! One executor turn per task runs at a time. A turn ends when the task
//! completes, errors, fails, or suspends for review; resumption starts a new
//! turn from the persisted state.

mod engine;
pub mod events;
mod executor;
mod graph;
mod resume;
pub mod stages;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::Engine;
pub use events::{stage_event_channel, EventSink, StageTransition};
pub use executor::{Executor, ExecutorError, RunOutcome};
pub use graph::{
    ConditionalEdge, Edge, GraphError, RoutePredicate, StageGraph, StageId, Transition,
    HUMAN_VERIFICATION_NEEDED, SYNTHESIZE_DATA,
};
pub use resume::{ResumeController, ResumeError, ResumeHandle};
pub use stages::{Collaborators, SharedStage, Stage};
