//! HTTP API for Knowledge Nexus.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /research` - Queue a research task
//! - `GET /status/{task_id}` - Task status, progress and any pending verification request
//! - `POST /submit-verification/{task_id}` - Resume a task with a reviewer decision
//! - `GET /results/{task_id}` - Final report of a completed task
//! - `GET /tasks` - List tasks

mod routes;
pub mod types;

pub use routes::{build_engine, router, serve, AppState};
pub use types::*;
