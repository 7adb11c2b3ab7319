use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Worker health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("No executors available")]
    NoExecutorsAvailable,

    #[error("Executor rejected task: {0}")]
    ExecutorRejectedTask(String),

    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Execution timed out after {0}s")]
    ExecutionTimeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GridError {
    /// Stable classification string surfaced in HTTP error bodies.
    pub fn classification(&self) -> &'static str {
        match self {
            GridError::HealthCheckFailed(_) => "health_check_failed",
            GridError::NoExecutorsAvailable => "no_executors_available",
            GridError::ExecutorRejectedTask(_) => "executor_rejected",
            GridError::WorkerNotFound(_) => "worker_not_found",
            GridError::TaskNotFound(_) => "task_not_found",
            GridError::UnsupportedLanguage(_) => "unsupported_language",
            GridError::InterpreterNotFound(_) => "interpreter_not_found",
            GridError::ExecutionTimeout(_) => "execution_timeout",
            GridError::InvalidRequest(_) => "invalid_request",
            GridError::Http(_) => "transport_error",
            GridError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GridError::NoExecutorsAvailable => StatusCode::SERVICE_UNAVAILABLE,
            GridError::HealthCheckFailed(_)
            | GridError::UnsupportedLanguage(_)
            | GridError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GridError::WorkerNotFound(_) | GridError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for GridError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            code: self.classification(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
