//! Web search collaborator.
//!
//! Uses the Tavily API when `TAVILY_API_KEY` is set, otherwise a deterministic
//! simulator so the pipeline still runs end to end.

mod simulated;
mod tavily;

pub use simulated::SimulatedSearch;
pub use tavily::TavilySearch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::ResearchRecord;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search topic cannot be empty.")]
    EmptyTopic,

    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// A single hit returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl From<SearchHit> for ResearchRecord {
    fn from(hit: SearchHit) -> Self {
        let mut record = ResearchRecord::new(hit.id, hit.url, hit.title, hit.snippet, hit.score);
        record.raw_content = hit.raw_content;
        record.source_name = hit.source_name;
        record
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider label for health reporting.
    fn name(&self) -> &str;

    async fn search(&self, topic: &str, num_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}
