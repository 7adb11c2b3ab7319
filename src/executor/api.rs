use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::GridError;
use crate::executor::engine::TaskEngine;
use crate::executor::task::{Task, TaskSpec, TaskStatus};

/// Tasks returned by one listing call, newest first.
const TASK_LIST_LIMIT: usize = 100;

#[derive(Clone)]
pub struct ExecutorState {
    pub engine: Arc<TaskEngine>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub id: Uuid,
    pub status: TaskStatus,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub total: usize,
}

pub fn router(state: ExecutorState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ping", get(ping_handler))
        .route("/tasks", post(create_task_handler).get(list_tasks_handler))
        .route("/tasks/:id", get(get_task_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "service": "taskgrid-executor",
        "status": "running",
        "supported_languages": ["python", "javascript", "bash"],
        "endpoints": ["/", "/health", "/ping", "/tasks", "/tasks/:id", "/stats"],
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "taskgrid-executor" }))
}

async fn ping_handler() -> impl IntoResponse {
    Json(json!({ "pong": true, "timestamp": Utc::now() }))
}

/// Accept a task and enqueue it. The response returns before the task
/// runs; callers poll `GET /tasks/:id` for the result.
async fn create_task_handler(
    State(state): State<ExecutorState>,
    Json(spec): Json<TaskSpec>,
) -> (StatusCode, Json<CreateTaskResponse>) {
    let id = state.engine.create(spec.task_type, spec.payload).await;

    (
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            id,
            status: TaskStatus::Pending,
            message: "Task queued".to_string(),
        }),
    )
}

async fn get_task_handler(
    State(state): State<ExecutorState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, GridError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| GridError::InvalidRequest(format!("invalid task id: {}", id)))?;

    state
        .engine
        .get(&id)
        .await
        .map(Json)
        .ok_or(GridError::TaskNotFound(id))
}

async fn list_tasks_handler(State(state): State<ExecutorState>) -> impl IntoResponse {
    let tasks = state.engine.list().await;
    let total = tasks.len();

    Json(TaskListResponse {
        tasks: tasks.into_iter().take(TASK_LIST_LIMIT).collect(),
        total,
    })
}

async fn stats_handler(State(state): State<ExecutorState>) -> impl IntoResponse {
    Json(state.engine.stats().await)
}
