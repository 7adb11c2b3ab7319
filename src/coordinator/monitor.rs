use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::CoordinatorConfig;
use crate::coordinator::registry::{WorkerRegistry, WorkerStatus};

/// Probe one executor's health endpoint within the given timeout.
pub async fn probe_worker(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let endpoint = format!("{}/health", url.trim_end_matches('/'));
    match client.get(&endpoint).timeout(timeout).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!(url, error = %e, "Health probe failed");
            false
        }
    }
}

/// Periodically probes every registered executor and updates its liveness
/// state. After initial registration this is the sole writer of liveness
/// transitions.
pub struct HeartbeatMonitor {
    registry: Arc<WorkerRegistry>,
    client: reqwest::Client,
    interval: Duration,
    probe_timeout: Duration,
}

impl HeartbeatMonitor {
    pub fn new(registry: Arc<WorkerRegistry>, config: &CoordinatorConfig) -> Self {
        Self {
            registry,
            client: reqwest::Client::new(),
            interval: config.heartbeat_interval,
            probe_timeout: config.probe_timeout,
        }
    }

    /// Run heartbeat cycles until the token is cancelled.
    pub async fn run(self, token: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Heartbeat monitor started");
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.probe_all().await;
                }
                _ = token.cancelled() => {
                    tracing::info!("Heartbeat monitor stopping");
                    break;
                }
            }
        }
    }

    /// One heartbeat cycle. The worker list is snapshotted under the
    /// registry lock and released before any probe; a failed probe for one
    /// worker never blocks or aborts probing the others.
    pub async fn probe_all(&self) {
        let workers = self.registry.list().await;

        for worker in workers {
            let healthy = probe_worker(&self.client, &worker.url, self.probe_timeout).await;
            if healthy {
                if worker.status == WorkerStatus::Offline {
                    tracing::info!(worker_id = %worker.id, "Worker back online");
                }
                self.registry.mark_online(&worker.id).await;
            } else {
                if worker.status == WorkerStatus::Online {
                    tracing::warn!(worker_id = %worker.id, url = %worker.url, "Worker went offline");
                }
                self.registry.mark_offline(&worker.id).await;
            }
        }
    }
}
