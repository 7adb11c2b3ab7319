use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Liveness state of a registered executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Online,
    Offline,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Online => write!(f, "online"),
            WorkerStatus::Offline => write!(f, "offline"),
        }
    }
}

/// One registered executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub status: WorkerStatus,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub tasks_assigned: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    workers: HashMap<String, WorkerRecord>,
    /// Registration order, used for `list` and dispatch tie-breaking
    order: Vec<String>,
}

/// Authoritative set of known executors.
///
/// All reads and writes go through one coarse lock held only for the map
/// operation itself, never across a network call. Liveness probes happen in
/// the caller before `insert` and in the heartbeat monitor.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    state: RwLock<RegistryState>,
    next_seq: AtomicU64,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a worker that already passed its registration probe.
    ///
    /// Ids combine the supplied name with a monotonic sequence number, so
    /// concurrent registrations can never mint the same id and ids are
    /// never reused.
    pub async fn insert(&self, name: &str, url: &str) -> WorkerRecord {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let record = WorkerRecord {
            id: format!("{}-{}", name, seq),
            name: name.to_string(),
            url: url.trim_end_matches('/').to_string(),
            status: WorkerStatus::Online,
            registered_at: now,
            last_heartbeat: now,
            tasks_assigned: 0,
        };

        let mut state = self.state.write().await;
        state.order.push(record.id.clone());
        state.workers.insert(record.id.clone(), record.clone());
        record
    }

    /// All workers in registration order.
    pub async fn list(&self) -> Vec<WorkerRecord> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|id| state.workers.get(id))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<WorkerRecord> {
        self.state.read().await.workers.get(id).cloned()
    }

    /// Mark a worker online and refresh its heartbeat timestamp.
    /// Unknown ids are ignored, so the operation is idempotent.
    pub async fn mark_online(&self, id: &str) {
        let mut state = self.state.write().await;
        if let Some(worker) = state.workers.get_mut(id) {
            worker.status = WorkerStatus::Online;
            worker.last_heartbeat = Utc::now();
        }
    }

    /// Mark a worker offline. The record stays visible but is excluded
    /// from dispatch until a probe succeeds again.
    pub async fn mark_offline(&self, id: &str) {
        let mut state = self.state.write().await;
        if let Some(worker) = state.workers.get_mut(id) {
            worker.status = WorkerStatus::Offline;
        }
    }

    /// Bump the load counter after a successful forward. The counter is a
    /// monotonic dispatch tie-breaker, not an in-flight count.
    pub async fn record_assignment(&self, id: &str) {
        let mut state = self.state.write().await;
        if let Some(worker) = state.workers.get_mut(id) {
            worker.tasks_assigned += 1;
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.workers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.workers.is_empty()
    }

    pub async fn online_count(&self) -> usize {
        let state = self.state.read().await;
        state
            .workers
            .values()
            .filter(|w| w.status == WorkerStatus::Online)
            .count()
    }
}
