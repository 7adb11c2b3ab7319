//! Executor node: task queue, consumption loop, and sandboxed execution.
//!
//! An executor accepts tasks over HTTP, queues them, and runs them one at
//! a time:
//!
//! - [`TaskEngine`]: task records, FIFO queue, and the consumption loop
//! - [`SandboxRunner`]: subprocess-based code execution with timeout and
//!   scratch-file cleanup
//! - [`api`]: the HTTP surface (submission, status polling, stats)
//!
//! # Execution Flow
//!
//! 1. `POST /tasks` enqueues a pending task and returns its id
//! 2. the consumption loop dequeues it and runs the type handler
//! 3. `code` tasks spawn an interpreter subprocess via [`SandboxRunner`]
//! 4. the submitter polls `GET /tasks/:id` until completed or failed
//!
//! # Isolation Note
//!
//! Code fragments run in a separate process with a bounded wall-clock
//! time. This is not a security boundary.

pub mod api;
pub mod engine;
pub mod runner;
pub mod task;

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::ExecutorConfig;

pub use engine::{EngineStats, TaskEngine};
pub use runner::{CodeRequest, ExecutionResult, SandboxRunner};
pub use task::{Task, TaskSpec, TaskStatus, TaskType};

/// Main executor process: spawns the consumption loop, serves the HTTP
/// API, and optionally self-registers with a coordinator.
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub async fn run(self, token: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
        let engine = Arc::new(TaskEngine::new(&self.config));

        let engine_token = token.clone();
        tokio::spawn(engine.clone().run(engine_token));

        let app = api::router(api::ExecutorState {
            engine: engine.clone(),
        });

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, name = %self.config.name, "Executor listening");

        // Registration runs concurrently with serving; the listener is
        // already bound, so the coordinator's probe connects even while
        // the accept loop is starting up.
        if let Some(coordinator) = self.config.coordinator_url.clone() {
            let advertise = self
                .config
                .advertise_url
                .clone()
                .unwrap_or_else(|| format!("http://{}", local_addr));
            let name = self.config.name.clone();
            tokio::spawn(async move {
                register_with_coordinator(&coordinator, &name, &advertise).await;
            });
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(token.cancelled_owned())
            .await?;
        Ok(())
    }
}

/// Announce this executor to a coordinator. Failure is logged, not fatal;
/// registration can be repeated through the coordinator's API.
async fn register_with_coordinator(coordinator: &str, name: &str, url: &str) {
    let client = reqwest::Client::new();
    let endpoint = format!("{}/workers/register", coordinator.trim_end_matches('/'));
    let body = json!({ "name": name, "url": url });

    match client
        .post(&endpoint)
        .timeout(std::time::Duration::from_secs(10))
        .json(&body)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            tracing::info!(coordinator, url, "Registered with coordinator");
        }
        Ok(response) => {
            tracing::warn!(
                coordinator,
                status = %response.status(),
                "Coordinator rejected registration"
            );
        }
        Err(e) => {
            tracing::warn!(coordinator, error = %e, "Failed to reach coordinator");
        }
    }
}
