//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::llm::{LanguageModel, OpenRouterModel, UnavailableModel};
use crate::search::{SearchProvider, SimulatedSearch, TavilySearch};
use crate::storage::InMemoryRecordStorage;
use crate::store::{InMemoryTaskStore, StoreError};
use crate::task::{TaskId, TaskStatus};
use crate::workflow::{Collaborators, Engine, EventSink, ResumeError, StageGraph};

use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub engine: Engine,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let engine = build_engine(&config)?;
    let state = Arc::new(AppState {
        config: config.clone(),
        engine,
    });

    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wire collaborators from configuration and build the engine.
pub fn build_engine(config: &Config) -> anyhow::Result<Engine> {
    let search: Arc<dyn SearchProvider> = match &config.tavily_api_key {
        Some(key) => Arc::new(TavilySearch::new(key.clone())?),
        None => {
            tracing::warn!("TAVILY_API_KEY not set; using simulated search results");
            Arc::new(SimulatedSearch)
        }
    };

    let llm: Arc<dyn LanguageModel> = match &config.openrouter_api_key {
        Some(key) => Arc::new(OpenRouterModel::new(
            key.clone(),
            config.default_model.clone(),
            config.llm_temperature,
        )),
        None => {
            tracing::warn!("OPENROUTER_API_KEY not set; synthesis will be simulated");
            Arc::new(UnavailableModel)
        }
    };

    let deps = Collaborators {
        search,
        storage: Arc::new(InMemoryRecordStorage::new()),
        llm,
        num_search_results: config.search_num_results,
    };

    tracing::info!(
        search_provider = %deps.search.name(),
        llm_available = deps.llm.is_available(),
        review_threshold = ?config.review_threshold,
        "Collaborators configured"
    );

    let engine = Engine::new(
        Arc::new(InMemoryTaskStore::new()),
        StageGraph::research(config.review_threshold),
        deps,
        EventSink::default(),
    )?;
    Ok(engine)
}

/// Build the router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/research", post(start_research))
        .route("/status/:task_id", get(get_status))
        .route("/submit-verification/:task_id", post(submit_verification))
        .route("/results/:task_id", get(get_results))
        .route("/tasks", get(list_tasks))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received; suspended tasks are not persisted");
}

fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound(id) => (StatusCode::NOT_FOUND, format!("Task with ID '{}' not found.", id)),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

/// Malformed ids cannot name a task, so they are reported like unknown ones.
fn parse_task_id(raw: &str) -> Result<TaskId, (StatusCode, String)> {
    Uuid::parse_str(raw).map(TaskId::from).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            format!("Task with ID '{}' not found.", raw),
        )
    })
}

async fn load_record(
    state: &AppState,
    task_id: TaskId,
) -> Result<crate::task::TaskRecord, (StatusCode, String)> {
    state
        .engine
        .get(task_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| store_error(StoreError::NotFound(task_id)))
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let deps = state.engine.collaborators();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_available: deps.llm.is_available(),
        search_provider: deps.search.name().to_string(),
    })
}

/// Queue a research task and start it in the background.
async fn start_research(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResearchRequest>,
) -> Result<(StatusCode, Json<ResearchStatus>), (StatusCode, String)> {
    if req.topic.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Topic cannot be empty.".to_string()));
    }

    let record = state.engine.submit(&req.topic).await.map_err(store_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ResearchStatus::from_record(&record)),
    ))
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<ResearchStatus>, (StatusCode, String)> {
    let record = load_record(&state, parse_task_id(&task_id)?).await?;
    Ok(Json(ResearchStatus::from_record(&record)))
}

/// Hand a reviewer's decision to a suspended task.
async fn submit_verification(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(submission): Json<VerificationSubmission>,
) -> Result<(StatusCode, Json<VerificationAccepted>), (StatusCode, String)> {
    let task_id = parse_task_id(&task_id)?;
    let approval = submission.into_approval(task_id);

    // The handle is detached; progress is observed through /status.
    let _handle = state
        .engine
        .resume(task_id, approval)
        .await
        .map_err(|e| match e {
            ResumeError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            ResumeError::WrongState { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
            ResumeError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(VerificationAccepted {
            task_id,
            status: TaskStatus::Resuming,
            message: format!(
                "Verification submitted for task '{}'. Workflow is scheduled to resume.",
                task_id
            ),
        }),
    ))
}

async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let record = load_record(&state, parse_task_id(&task_id)?).await?;

    if record.status == TaskStatus::Completed {
        return Ok(Json(DocumentOutput::from_record(&record)).into_response());
    }

    if record.status.is_inconclusive() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "Task ended inconclusively. Status: {}. Error: {}",
                record.status,
                record
                    .error_message
                    .as_deref()
                    .unwrap_or("No specific error message.")
            ),
        ));
    }

    let pending = PendingResult {
        task_id: record.task_id,
        status: record.status,
        detail: format!(
            "Task '{}' is not yet completed. Current status: {}.",
            record.task_id, record.status
        ),
    };
    Ok((StatusCode::ACCEPTED, Json(pending)).into_response())
}

/// List tasks, most recently updated first.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TaskSummary>>, (StatusCode, String)> {
    let records = state.engine.list().await.map_err(store_error)?;
    Ok(Json(records.iter().map(TaskSummary::from).collect()))
}
