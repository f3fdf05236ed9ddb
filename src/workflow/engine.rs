//! Facade wiring the store, graph, executor and resume controller together.

use std::sync::Arc;

use super::events::EventSink;
use super::executor::{Executor, ExecutorError, RunOutcome};
use super::graph::{GraphError, StageGraph};
use super::resume::{ResumeController, ResumeError, ResumeHandle};
use super::stages::Collaborators;
use crate::store::{now_string, StoreError, TaskStore};
use crate::task::{Approval, TaskId, TaskRecord};

#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn TaskStore>,
    executor: Arc<Executor>,
    resume: ResumeController,
    deps: Collaborators,
}

impl Engine {
    /// Build an engine over `graph`. Fails if the graph is incomplete.
    pub fn new(
        store: Arc<dyn TaskStore>,
        graph: StageGraph,
        deps: Collaborators,
        events: EventSink,
    ) -> Result<Self, GraphError> {
        graph.validate()?;
        let executor = Arc::new(Executor::new(
            Arc::clone(&store),
            Arc::new(graph),
            deps.clone(),
            events,
        ));
        let resume = ResumeController::new(Arc::clone(&store), Arc::clone(&executor));
        Ok(Self {
            store,
            executor,
            resume,
            deps,
        })
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.deps
    }

    /// Register a queued task without starting it.
    pub async fn create_task(&self, topic: &str) -> Result<TaskRecord, StoreError> {
        let record = TaskRecord::new(TaskId::new(), topic.trim(), now_string());
        self.store.insert(record.clone()).await?;
        tracing::info!(task_id = %record.task_id, topic = %record.topic, "Task queued");
        Ok(record)
    }

    /// Run a queued or resuming task to its next stopping point.
    pub async fn run(&self, task_id: TaskId) -> Result<RunOutcome, ExecutorError> {
        self.executor.run(task_id).await
    }

    /// Create a task and start it in the background.
    pub async fn submit(&self, topic: &str) -> Result<TaskRecord, StoreError> {
        let record = self.create_task(topic).await?;
        let executor = Arc::clone(&self.executor);
        let task_id = record.task_id;
        tokio::spawn(async move {
            if let Err(e) = executor.run(task_id).await {
                tracing::error!(task_id = %task_id, error = %e, "Run could not start");
            }
        });
        Ok(record)
    }

    pub async fn resume(
        &self,
        task_id: TaskId,
        approval: Approval,
    ) -> Result<ResumeHandle, ResumeError> {
        self.resume.resume(task_id, approval).await
    }

    pub async fn get(&self, task_id: TaskId) -> Result<Option<TaskRecord>, StoreError> {
        self.store.get(task_id).await
    }

    pub async fn list(&self) -> Result<Vec<TaskRecord>, StoreError> {
        self.store.list().await
    }
}
