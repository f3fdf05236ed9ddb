use async_trait::async_trait;

use super::{append_error, Collaborators, Stage};
use crate::task::{ResearchRecord, TaskStage, TaskState};

/// Searches the web for the topic and stores what it finds.
pub struct ResearchStage;

#[async_trait]
impl Stage for ResearchStage {
    async fn apply(&self, mut state: TaskState, deps: &Collaborators) -> TaskState {
        state.current_stage = TaskStage::Researching;
        let task_id = state.task_id();

        if state.topic().trim().is_empty() {
            tracing::warn!(task_id = %task_id, "Research requested without a topic");
            state.error_message =
                Some("Topic or Task ID is missing, cannot conduct research.".to_string());
            return state;
        }
        state.error_message = None;

        let topic = state.topic().to_string();
        tracing::info!(task_id = %task_id, topic = %topic, "Starting research");

        let hits = match deps.search.search(&topic, deps.num_search_results).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Search failed");
                append_error(&mut state, format!("Search failed: {}", e));
                Vec::new()
            }
        };

        let records: Vec<ResearchRecord> = hits.into_iter().map(ResearchRecord::from).collect();
        state.add_sources_explored(records.len() as u64);
        state.extend_research(records.iter().cloned());
        tracing::info!(
            task_id = %task_id,
            new_items = records.len(),
            total_items = state.data_collected(),
            sources_explored = state.sources_explored(),
            "Research collected"
        );

        if !deps.storage.is_available() {
            tracing::warn!(task_id = %task_id, "Storage not available; skipping persistence");
            append_error(&mut state, "Storage not available; data not saved.");
        } else if !records.is_empty() {
            match deps.storage.add_records(task_id, &records, &topic).await {
                Ok(stored) => tracing::debug!(task_id = %task_id, stored, "Research stored"),
                Err(e) => {
                    tracing::warn!(task_id = %task_id, error = %e, "Storing research failed");
                    append_error(&mut state, format!("DB storage failed: {}", e));
                }
            }
        }

        state
    }
}
