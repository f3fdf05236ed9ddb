//! # Knowledge Nexus
//!
//! Research assistant service that drives each task through a fixed graph of
//! stages, pausing for human review when a record needs a second opinion.
//!
//! ## Architecture
//!
//! ```text
//!   research ──► verify ──┬──► await_human_input ──┐
//!                         │                        ▼
//!                         └──────────────────► synthesize ──► detect_conflicts ──► generate_document ──► END
//! ```
//!
//! ## Task Flow
//! 1. Receive a topic via the API and queue a task
//! 2. Run stages in order, persisting the task state after each one
//! 3. Suspend when verification asks for a human decision
//! 4. Resume with the submitted decision and finish the report
//!
//! ## Modules
//! - `workflow`: stage graph, executor and resume controller
//! - `task`: per-task state, control block and progress projection
//! - `store`: concurrent task store
//! - `search`, `storage`, `llm`: external collaborators used by stages
//! - `api`: HTTP surface

pub mod api;
pub mod config;
pub mod llm;
pub mod search;
pub mod storage;
pub mod store;
pub mod task;
pub mod workflow;

pub use config::Config;
pub use workflow::Engine;
