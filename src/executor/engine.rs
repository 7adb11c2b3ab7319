//! Task lifecycle engine for one executor.
//!
//! The engine owns the task map and the FIFO queue of pending task ids.
//! A single consumption loop pulls one id at a time and runs the matching
//! handler to completion before touching the next, so tasks on one
//! executor never overlap:
//!
//! 1. [`TaskEngine::create`] inserts a pending record and enqueues the id
//! 2. the loop dequeues and marks the task processing
//! 3. the type handler runs inline (`code` goes through [`SandboxRunner`])
//! 4. the task is marked completed with its result, or failed with the
//!    error text
//!
//! Handler failures are recorded on the task that caused them and never
//! terminate the loop. Finished tasks stay in the map until the process
//! restarts; there is no eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ExecutorConfig;
use crate::error::{GridError, Result};
use crate::executor::runner::{CodeRequest, SandboxRunner};
use crate::executor::task::{Task, TaskStatus, TaskType};

#[derive(Debug, Default)]
struct EngineState {
    tasks: HashMap<Uuid, Task>,
    queue: VecDeque<Uuid>,
    completed: u64,
    failed: u64,
    pending: u64,
}

/// Snapshot of engine counters for the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub started_at: DateTime<Utc>,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_pending: u64,
    pub total_tasks: usize,
}

pub struct TaskEngine {
    state: RwLock<EngineState>,
    runner: SandboxRunner,
    poll_interval: Duration,
    started_at: DateTime<Utc>,
}

impl TaskEngine {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            runner: SandboxRunner::new(config.runner.clone()),
            poll_interval: config.poll_interval,
            started_at: Utc::now(),
        }
    }

    /// Insert a pending task and enqueue its id. Returns immediately; the
    /// consumption loop picks the task up later.
    pub async fn create(&self, task_type: TaskType, payload: Value) -> Uuid {
        let task = Task::new(task_type, payload);
        let id = task.id;

        let mut state = self.state.write().await;
        state.queue.push_back(id);
        state.tasks.insert(id, task);
        state.pending += 1;
        drop(state);

        tracing::info!(task_id = %id, task_type = %task_type, "Task created");
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Task> {
        self.state.read().await.tasks.get(id).cloned()
    }

    /// All tasks, newest first.
    pub async fn list(&self) -> Vec<Task> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state.tasks.values().cloned().collect();
        tasks.sort_by_key(|t| std::cmp::Reverse(t.created_at));
        tasks
    }

    pub async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        EngineStats {
            started_at: self.started_at,
            tasks_completed: state.completed,
            tasks_failed: state.failed,
            tasks_pending: state.pending,
            total_tasks: state.tasks.len(),
        }
    }

    /// The consumption loop. One task at a time, in enqueue order, until
    /// the token is cancelled. The lock is only held for the queue pop and
    /// the state transitions, never across a handler.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        tracing::info!("Task engine started");

        loop {
            if token.is_cancelled() {
                break;
            }

            let next = { self.state.write().await.queue.pop_front() };
            match next {
                Some(id) => self.process(id).await,
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = token.cancelled() => break,
                    }
                }
            }
        }

        tracing::info!("Task engine stopped");
    }

    async fn process(&self, id: Uuid) {
        // Mark processing. An unknown id means the record was removed;
        // skip it silently.
        let task = {
            let mut state = self.state.write().await;
            let Some(task) = state.tasks.get_mut(&id) else {
                return;
            };
            task.status = TaskStatus::Processing;
            task.started_at = Some(Utc::now());
            task.clone()
        };

        tracing::info!(task_id = %id, task_type = %task.task_type, "Processing task");

        let outcome = self.handle(task.task_type, &task.payload).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.pending = state.pending.saturating_sub(1);
        match outcome {
            Ok(result) => {
                state.completed += 1;
                if let Some(task) = state.tasks.get_mut(&id) {
                    task.status = TaskStatus::Completed;
                    task.result = Some(result);
                    task.completed_at = Some(Utc::now());
                }
                tracing::info!(task_id = %id, "Task completed");
            }
            Err(e) => {
                state.failed += 1;
                if let Some(task) = state.tasks.get_mut(&id) {
                    task.status = TaskStatus::Failed;
                    task.error = Some(e.to_string());
                    task.completed_at = Some(Utc::now());
                }
                tracing::warn!(task_id = %id, error = %e, "Task failed");
            }
        }
    }

    /// Run the handler for one task type. The caller blocks for the full
    /// duration, including the runner's subprocess timeout.
    async fn handle(&self, task_type: TaskType, payload: &Value) -> Result<Value> {
        match task_type {
            TaskType::Code => {
                let request: CodeRequest = serde_json::from_value(payload.clone())
                    .map_err(|e| GridError::InvalidRequest(format!("bad code payload: {}", e)))?;
                let result = self.runner.execute(&request).await?;
                serde_json::to_value(result).map_err(|e| GridError::Internal(e.to_string()))
            }
            TaskType::Compute => compute(payload),
            TaskType::Sleep => {
                let duration = payload
                    .get("duration")
                    .and_then(Value::as_f64)
                    .unwrap_or(1.0);
                if !duration.is_finite() || duration < 0.0 {
                    return Err(GridError::InvalidRequest(format!(
                        "bad sleep duration: {}",
                        duration
                    )));
                }
                tokio::time::sleep(Duration::from_secs_f64(duration)).await;
                Ok(json!({ "slept": duration }))
            }
            TaskType::Echo => {
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("hello");
                Ok(json!({ "echo": message }))
            }
        }
    }
}

/// In-process arithmetic over a numbers array.
fn compute(payload: &Value) -> Result<Value> {
    let operation = payload
        .get("operation")
        .and_then(Value::as_str)
        .unwrap_or("add");

    match operation {
        "add" => {
            let sum: f64 = numbers_from(payload).iter().sum();
            Ok(json!({ "result": sum }))
        }
        "multiply" => {
            let product: f64 = numbers_from(payload).iter().product();
            Ok(json!({ "result": product }))
        }
        "factorial" => {
            let n = payload.get("number").and_then(Value::as_u64).unwrap_or(5);
            if n > 20 {
                return Err(GridError::InvalidRequest(format!(
                    "factorial of {} overflows",
                    n
                )));
            }
            let result: u64 = (1..=n).product();
            Ok(json!({ "result": result }))
        }
        other => Err(GridError::InvalidRequest(format!(
            "unsupported compute operation: {}",
            other
        ))),
    }
}

fn numbers_from(payload: &Value) -> Vec<f64> {
    payload
        .get("numbers")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_else(|| vec![1.0, 2.0, 3.0])
}
