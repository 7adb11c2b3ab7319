//! Coordinator node: worker registry, heartbeat monitoring, and dispatch.
//!
//! The coordinator holds the authoritative set of executors and routes
//! inbound tasks to them:
//!
//! - [`WorkerRegistry`]: registered executors, liveness state, load counters
//! - [`HeartbeatMonitor`]: periodic health probes driving online/offline
//! - [`Dispatcher`]: least-loaded executor selection and task forwarding
//! - [`api`]: the HTTP surface (registration, listing, distribution, stats)
//!
//! Registration probes the candidate executor first; a worker that stops
//! answering probes stays registered but is excluded from dispatch until it
//! recovers.

pub mod api;
pub mod dispatcher;
pub mod monitor;
pub mod registry;

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::CoordinatorConfig;

pub use dispatcher::{DispatchReceipt, Dispatcher};
pub use monitor::HeartbeatMonitor;
pub use registry::{WorkerRecord, WorkerRegistry, WorkerStatus};

/// Main coordinator process: spawns the heartbeat loop and serves the
/// HTTP API until shutdown.
pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub async fn run(self, token: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
        let registry = Arc::new(WorkerRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), &self.config));

        let monitor = HeartbeatMonitor::new(registry.clone(), &self.config);
        let monitor_token = token.clone();
        tokio::spawn(async move {
            monitor.run(monitor_token).await;
        });

        let state = api::CoordinatorState {
            registry,
            dispatcher,
            probe_client: reqwest::Client::new(),
            probe_timeout: self.config.probe_timeout,
            started_at: Utc::now(),
        };
        let app = api::router(state);

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        tracing::info!(addr = %self.config.listen_addr, "Coordinator listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(token.cancelled_owned())
            .await?;
        Ok(())
    }
}
