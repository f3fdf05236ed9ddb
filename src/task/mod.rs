//! Task module - the per-task working state and its control block.
//!
//! This module is designed with explicit invariants in mind:
//! - All status and stage values are closed enums with exhaustive matching
//! - HITL flags and counters are only mutated through methods that keep them consistent
//! - Progress reporting is a pure projection, separate from any IO

mod progress;
mod record;
mod state;

pub use progress::progress_of;
pub use record::{TaskRecord, TaskStatus};
pub use state::{
    Approval, Conflict, DataPreview, ResearchRecord, ReviewStatus, TaskId, TaskStage, TaskState,
    VerificationRequest,
};
