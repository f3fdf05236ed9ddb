//! Tavily search API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::{SearchError, SearchHit, SearchProvider};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

pub struct TavilySearch {
    client: Client,
    api_key: String,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, api_key })
    }
}

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    raw_content: Option<String>,
}

impl From<TavilyResult> for SearchHit {
    fn from(result: TavilyResult) -> Self {
        SearchHit {
            id: format!("tvly_{}", Uuid::new_v4()),
            url: result.url,
            title: result.title,
            snippet: result.content,
            score: result.score,
            raw_content: result.raw_content,
            source_name: Some("Tavily".to_string()),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, topic: &str, num_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SearchError::EmptyTopic);
        }

        let request = TavilySearchRequest {
            api_key: &self.api_key,
            query: topic,
            max_results: num_results,
            include_raw_content: true,
        };

        let response = self
            .client
            .post(TAVILY_API_URL)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api { status, body });
        }

        let parsed: TavilySearchResponse = response.json().await?;
        tracing::debug!(topic, hits = parsed.results.len(), "Tavily search complete");
        Ok(parsed.results.into_iter().map(SearchHit::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_maps_content_to_snippet() {
        let parsed: TavilySearchResponse = serde_json::from_str(
            r#"{"results":[{"title":"T","url":"https://a","content":"body","score":0.42}]}"#,
        )
        .unwrap();
        let hit: SearchHit = parsed.results.into_iter().next().unwrap().into();
        assert_eq!(hit.snippet, "body");
        assert_eq!(hit.score, 0.42);
        assert!(hit.id.starts_with("tvly_"));
    }

    #[tokio::test]
    async fn test_empty_topic_rejected_before_request() {
        let search = TavilySearch::new("key".to_string()).unwrap();
        let err = search.search("   ", 5).await.unwrap_err();
        assert!(matches!(err, SearchError::EmptyTopic));
    }
}
