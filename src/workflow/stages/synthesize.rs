use async_trait::async_trait;

use super::{Collaborators, Stage};
use crate::task::{ResearchRecord, TaskStage, TaskState};

pub(crate) const NO_VERIFIED_DATA: &str = "No verified data available to synthesize.";
pub(crate) const SIMULATED_PREFIX: &str = "Simulated synthesis";

/// Condenses the usable verified records into a single narrative.
///
/// Records a human rejected are left out.
pub struct SynthesisStage;

fn build_prompt(topic: &str, sources: &[&ResearchRecord]) -> String {
    let mut prompt = format!(
        "You are a research analyst. Synthesize the following sources into a coherent, \
         well-structured summary about \"{}\". Highlight key findings and note where \
         sources disagree.\n\n",
        topic
    );
    for (i, record) in sources.iter().enumerate() {
        prompt.push_str(&format!(
            "Source {} (Title: {}, URL: {}):\n{}\n---\n",
            i + 1,
            record.title,
            record.url,
            record.snippet
        ));
    }
    prompt.push_str("\nSynthesis:");
    prompt
}

fn simulated_synthesis(topic: &str, sources: &[&ResearchRecord]) -> String {
    let mut text = format!(
        "{} for '{}' based on {} source(s):\n",
        SIMULATED_PREFIX,
        topic,
        sources.len()
    );
    for record in sources {
        text.push_str(&format!("- {}: {}\n", record.title, record.snippet));
    }
    text
}

#[async_trait]
impl Stage for SynthesisStage {
    async fn apply(&self, mut state: TaskState, deps: &Collaborators) -> TaskState {
        state.current_stage = TaskStage::Synthesizing;
        state.error_message = None;
        let task_id = state.task_id();

        let sources: Vec<&ResearchRecord> = state
            .verified_data()
            .iter()
            .filter(|r| !r.is_rejected())
            .collect();

        if sources.is_empty() {
            tracing::warn!(task_id = %task_id, "Nothing to synthesize");
            state.synthesized_content = NO_VERIFIED_DATA.to_string();
            state.error_message = Some("Synthesis skipped: No verified data.".to_string());
            return state;
        }

        if !deps.llm.is_available() {
            tracing::warn!(task_id = %task_id, "Language model unavailable; using simulated synthesis");
            state.synthesized_content = simulated_synthesis(state.topic(), &sources);
            return state;
        }

        let prompt = build_prompt(state.topic(), &sources);
        let source_count = sources.len();
        match deps.llm.invoke(&prompt).await {
            Ok(text) => {
                tracing::info!(task_id = %task_id, sources = source_count, "Synthesis complete");
                state.synthesized_content = text;
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Synthesis failed");
                state.error_message = Some(format!("LLM synthesis failed: {}", e));
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Approval, TaskId};
    use crate::workflow::testing::{collaborators, ScriptedModel, ScriptedSearch};
    use std::sync::Arc;

    fn verified_state() -> TaskState {
        let mut state = TaskState::new(TaskId::new(), "solar sails");
        state.extend_research(vec![
            ResearchRecord::new("a", "https://a", "Alpha", "alpha text", 0.9),
            ResearchRecord::new("b", "https://b", "Beta", "beta text", 0.8),
        ]);
        state.promote_unverified();
        state
    }

    #[test]
    fn test_prompt_lists_sources() {
        let state = verified_state();
        let sources: Vec<&ResearchRecord> = state.verified_data().iter().collect();
        let prompt = build_prompt(state.topic(), &sources);
        assert!(prompt.contains("Source 1 (Title: Alpha, URL: https://a):\nalpha text\n---"));
        assert!(prompt.contains("Source 2 (Title: Beta"));
    }

    #[tokio::test]
    async fn test_model_output_becomes_synthesis() {
        let mut deps = collaborators(ScriptedSearch::hits(0));
        deps.llm = Arc::new(ScriptedModel::replying("the summary"));
        let out = SynthesisStage.apply(verified_state(), &deps).await;
        assert_eq!(out.synthesized_content, "the summary");
        assert!(out.error_message.is_none());
    }

    #[tokio::test]
    async fn test_model_error_recorded() {
        let mut deps = collaborators(ScriptedSearch::hits(0));
        deps.llm = Arc::new(ScriptedModel::failing());
        let out = SynthesisStage.apply(verified_state(), &deps).await;
        assert!(out
            .error_message
            .unwrap()
            .starts_with("LLM synthesis failed:"));
    }

    #[tokio::test]
    async fn test_unavailable_model_simulates() {
        let mut deps = collaborators(ScriptedSearch::hits(0));
        deps.llm = Arc::new(crate::llm::UnavailableModel);
        let out = SynthesisStage.apply(verified_state(), &deps).await;
        assert!(out.synthesized_content.starts_with(SIMULATED_PREFIX));
        assert!(out.error_message.is_none());
    }

    #[tokio::test]
    async fn test_all_rejected_means_nothing_to_synthesize() {
        let deps = collaborators(ScriptedSearch::hits(0));
        let mut state = verified_state();
        for id in ["a", "b"] {
            let approval = Approval {
                task_id: state.task_id(),
                data_id: id.to_string(),
                approved: false,
                notes: None,
                corrected_content: None,
            };
            state.verified_record_mut(id).unwrap().apply_review(&approval);
        }
        let out = SynthesisStage.apply(state, &deps).await;
        assert_eq!(out.synthesized_content, NO_VERIFIED_DATA);
        assert_eq!(
            out.error_message.as_deref(),
            Some("Synthesis skipped: No verified data.")
        );
    }
}
