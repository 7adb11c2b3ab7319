use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::coordinator::dispatcher::Dispatcher;
use crate::coordinator::monitor::probe_worker;
use crate::coordinator::registry::{WorkerRecord, WorkerRegistry, WorkerStatus};
use crate::error::GridError;
use crate::executor::task::TaskSpec;

#[derive(Clone)]
pub struct CoordinatorState {
    pub registry: Arc<WorkerRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub probe_client: reqwest::Client,
    pub probe_timeout: Duration,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkersResponse {
    pub workers: Vec<WorkerRecord>,
    pub total: usize,
    pub online: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DistributeResponse {
    pub task_id: Uuid,
    pub executor_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoordinatorStatsResponse {
    pub started_at: DateTime<Utc>,
    pub total_tasks_distributed: u64,
    pub total_workers: usize,
    pub active_workers: usize,
}

pub fn router(state: CoordinatorState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/workers", get(list_workers_handler))
        .route("/workers/register", post(register_worker_handler))
        .route("/workers/:id/stats", get(worker_stats_handler))
        .route("/distribute", post(distribute_handler))
        .route("/stats", get(stats_handler))
        .layer(cors)
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "service": "taskgrid-coordinator",
        "status": "running",
        "endpoints": ["/", "/health", "/workers", "/workers/register", "/workers/:id/stats", "/distribute", "/stats"],
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "taskgrid-coordinator" }))
}

async fn list_workers_handler(State(state): State<CoordinatorState>) -> impl IntoResponse {
    let workers = state.registry.list().await;
    let online = workers
        .iter()
        .filter(|w| w.status == WorkerStatus::Online)
        .count();
    let total = workers.len();

    Json(WorkersResponse {
        workers,
        total,
        online,
    })
}

/// Register a new executor. The candidate must answer its health endpoint
/// within the probe timeout before a record is created.
async fn register_worker_handler(
    State(state): State<CoordinatorState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), GridError> {
    let Some(url) = request.url else {
        return Err(GridError::InvalidRequest("worker url required".to_string()));
    };
    let name = request
        .name
        .unwrap_or_else(|| "unnamed-worker".to_string());

    if !probe_worker(&state.probe_client, &url, state.probe_timeout).await {
        tracing::warn!(url = %url, "Registration health check failed");
        return Err(GridError::HealthCheckFailed(url));
    }

    let record = state.registry.insert(&name, &url).await;
    tracing::info!(worker_id = %record.id, url = %record.url, "Worker registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: record.id,
            status: "registered".to_string(),
        }),
    ))
}

async fn distribute_handler(
    State(state): State<CoordinatorState>,
    Json(spec): Json<TaskSpec>,
) -> Result<(StatusCode, Json<DistributeResponse>), GridError> {
    let receipt = state.dispatcher.distribute(&spec).await?;

    Ok((
        StatusCode::CREATED,
        Json(DistributeResponse {
            task_id: receipt.task_id,
            executor_id: receipt.executor_id,
            status: "pending".to_string(),
        }),
    ))
}

/// Proxy a worker's own stats endpoint, addressed by registry id.
async fn worker_stats_handler(
    State(state): State<CoordinatorState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, GridError> {
    let Some(worker) = state.registry.get(&id).await else {
        return Err(GridError::WorkerNotFound(id));
    };

    let stats = state
        .probe_client
        .get(format!("{}/stats", worker.url))
        .timeout(state.probe_timeout)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(Json(stats))
}

async fn stats_handler(State(state): State<CoordinatorState>) -> impl IntoResponse {
    Json(CoordinatorStatsResponse {
        started_at: state.started_at,
        total_tasks_distributed: state.dispatcher.dispatched_total(),
        total_workers: state.registry.len().await,
        active_workers: state.registry.online_count().await,
    })
}
