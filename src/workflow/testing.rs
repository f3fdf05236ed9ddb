//! Scripted collaborators for stage and executor tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::stages::Collaborators;
use crate::llm::{LanguageModel, LlmError};
use crate::search::{SearchError, SearchHit, SearchProvider};
use crate::storage::{InMemoryRecordStorage, RecordStorage, StorageError};
use crate::task::{ResearchRecord, TaskId};

pub struct ScriptedSearch {
    hits: usize,
    failure: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedSearch {
    pub fn hits(hits: usize) -> Self {
        Self {
            hits,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            hits: 0,
            failure: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(&self, topic: &str, _num_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(SearchError::Api {
                status: 503,
                body: message.clone(),
            });
        }
        Ok((0..self.hits)
            .map(|i| SearchHit {
                id: format!("hit-{}-{}", call, i),
                url: format!("https://example.com/{}", i),
                title: format!("{} result {}", topic, i),
                snippet: format!("Evidence {} about {}", i, topic),
                score: 0.9 - 0.1 * i as f64,
                raw_content: None,
                source_name: Some("scripted".to_string()),
            })
            .collect())
    }
}

pub struct ScriptedModel {
    reply: Option<String>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn is_available(&self) -> bool {
        true
    }

    async fn invoke(&self, _prompt: &str) -> Result<String, LlmError> {
        self.reply
            .clone()
            .ok_or_else(|| LlmError::from_status(400, "scripted failure", None))
    }
}

pub struct FailingStorage;

#[async_trait]
impl RecordStorage for FailingStorage {
    fn is_available(&self) -> bool {
        true
    }

    async fn add_records(
        &self,
        _task_id: TaskId,
        _records: &[ResearchRecord],
        _topic: &str,
    ) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn count_records(&self, _task_id: TaskId) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn clear_collection(&self, _task_id: TaskId) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// Storage that reports itself unavailable and is never written to.
pub struct UnavailableStorage;

#[async_trait]
impl RecordStorage for UnavailableStorage {
    fn is_available(&self) -> bool {
        false
    }

    async fn add_records(
        &self,
        _task_id: TaskId,
        _records: &[ResearchRecord],
        _topic: &str,
    ) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn count_records(&self, _task_id: TaskId) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn clear_collection(&self, _task_id: TaskId) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable)
    }
}

pub fn collaborators(search: ScriptedSearch) -> Collaborators {
    Collaborators {
        search: Arc::new(search),
        storage: Arc::new(InMemoryRecordStorage::new()),
        llm: Arc::new(ScriptedModel::replying("synthesized summary")),
        num_search_results: 5,
    }
}
