//! Offline search provider producing deterministic placeholder hits.

use async_trait::async_trait;
use uuid::Uuid;

use super::{SearchError, SearchHit, SearchProvider};

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSearch;

#[async_trait]
impl SearchProvider for SimulatedSearch {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn search(&self, topic: &str, num_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SearchError::EmptyTopic);
        }

        let slug = topic.replace(' ', "_");
        let hits = (0..num_results.min(2))
            .map(|i| SearchHit {
                id: format!("sim_{}", Uuid::new_v4()),
                url: format!("https://example.com/simulated/{}/{}", slug, i + 1),
                title: format!("Simulated result {} for {}", i + 1, topic),
                snippet: format!(
                    "Simulated snippet {} discussing {} for offline runs.",
                    i + 1,
                    topic
                ),
                score: 0.8 - 0.05 * i as f64,
                raw_content: None,
                source_name: Some("Search Simulator".to_string()),
            })
            .collect();
        Ok(hits)
    }
}
