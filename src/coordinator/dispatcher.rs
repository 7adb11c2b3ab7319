use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::coordinator::registry::{WorkerRegistry, WorkerStatus};
use crate::error::{GridError, Result};
use crate::executor::task::TaskSpec;

/// Receipt returned to the submitter. Task ids are only unique per
/// executor, so the executor id is needed to route status polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub task_id: Uuid,
    pub executor_id: String,
}

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    id: Uuid,
}

/// Selects a live executor for each inbound task and forwards it.
pub struct Dispatcher {
    registry: Arc<WorkerRegistry>,
    client: reqwest::Client,
    request_timeout: Duration,
    dispatched: AtomicU64,
}

impl Dispatcher {
    pub fn new(registry: Arc<WorkerRegistry>, config: &CoordinatorConfig) -> Self {
        Self {
            registry,
            client: reqwest::Client::new(),
            request_timeout: config.dispatch_timeout,
            dispatched: AtomicU64::new(0),
        }
    }

    /// Total successful dispatches since startup.
    pub fn dispatched_total(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Forward a task to the least-loaded online executor.
    ///
    /// Single-shot: a rejection or transport failure is surfaced to the
    /// caller without trying a second executor, and the chosen worker's
    /// load counter is only bumped after a success response.
    pub async fn distribute(&self, spec: &TaskSpec) -> Result<DispatchReceipt> {
        let online: Vec<_> = self
            .registry
            .list()
            .await
            .into_iter()
            .filter(|w| w.status == WorkerStatus::Online)
            .collect();

        // min_by_key keeps the first minimum, so ties go to the earliest
        // registration.
        let Some(target) = online.iter().min_by_key(|w| w.tasks_assigned) else {
            return Err(GridError::NoExecutorsAvailable);
        };

        let response = self
            .client
            .post(format!("{}/tasks", target.url))
            .timeout(self.request_timeout)
            .json(spec)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            let status = response.status();
            tracing::warn!(worker_id = %target.id, %status, "Executor rejected task");
            return Err(GridError::ExecutorRejectedTask(format!(
                "executor returned {}",
                status
            )));
        }

        let created: ForwardResponse = response.json().await?;
        self.registry.record_assignment(&target.id).await;
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            task_id = %created.id,
            worker_id = %target.id,
            "Task dispatched"
        );

        Ok(DispatchReceipt {
            task_id: created.id,
            executor_id: target.id.clone(),
        })
    }
}
