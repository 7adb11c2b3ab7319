//! Tests for the heartbeat monitor: offline detection, recovery, and
//! probe independence. Cycles are driven directly via `probe_all` so the
//! tests are deterministic.


use std::sync::Arc;

use taskgrid::coordinator::{HeartbeatMonitor, WorkerRegistry, WorkerStatus};
use test_harness::{test_coordinator_config, unreachable_url, StubWorker};

#[tokio::test]
async fn test_healthy_worker_stays_online() {
    let stub = StubWorker::spawn().await;
    let registry = Arc::new(WorkerRegistry::new());
    let worker = registry.insert("a", &stub.url).await;

    let monitor = HeartbeatMonitor::new(registry.clone(), &test_coordinator_config());
    monitor.probe_all().await;

    let record = registry.get(&worker.id).await.unwrap();
    assert_eq!(record.status, WorkerStatus::Online);
}

#[tokio::test]
async fn test_failing_worker_goes_offline_within_one_cycle() {
    let stub = StubWorker::spawn().await;
    let registry = Arc::new(WorkerRegistry::new());
    let worker = registry.insert("a", &stub.url).await;

    stub.set_healthy(false);
    let monitor = HeartbeatMonitor::new(registry.clone(), &test_coordinator_config());
    monitor.probe_all().await;

    let record = registry.get(&worker.id).await.unwrap();
    assert_eq!(record.status, WorkerStatus::Offline);
}

#[tokio::test]
async fn test_recovered_worker_comes_back_online() {
    let stub = StubWorker::spawn().await;
    let registry = Arc::new(WorkerRegistry::new());
    let worker = registry.insert("a", &stub.url).await;

    let monitor = HeartbeatMonitor::new(registry.clone(), &test_coordinator_config());

    stub.set_healthy(false);
    monitor.probe_all().await;
    assert_eq!(
        registry.get(&worker.id).await.unwrap().status,
        WorkerStatus::Offline
    );

    stub.set_healthy(true);
    monitor.probe_all().await;
    assert_eq!(
        registry.get(&worker.id).await.unwrap().status,
        WorkerStatus::Online
    );
}

#[tokio::test]
async fn test_successful_probe_refreshes_heartbeat() {
    let stub = StubWorker::spawn().await;
    let registry = Arc::new(WorkerRegistry::new());
    let worker = registry.insert("a", &stub.url).await;
    let registered_heartbeat = worker.last_heartbeat;

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let monitor = HeartbeatMonitor::new(registry.clone(), &test_coordinator_config());
    monitor.probe_all().await;

    let record = registry.get(&worker.id).await.unwrap();
    assert!(record.last_heartbeat > registered_heartbeat);
}

#[tokio::test]
async fn test_one_failing_probe_does_not_affect_others() {
    let healthy_stub = StubWorker::spawn().await;
    let failing_stub = StubWorker::spawn().await;
    failing_stub.set_healthy(false);

    let registry = Arc::new(WorkerRegistry::new());
    let healthy = registry.insert("healthy", &healthy_stub.url).await;
    let failing = registry.insert("failing", &failing_stub.url).await;

    let monitor = HeartbeatMonitor::new(registry.clone(), &test_coordinator_config());
    monitor.probe_all().await;

    assert_eq!(
        registry.get(&healthy.id).await.unwrap().status,
        WorkerStatus::Online
    );
    assert_eq!(
        registry.get(&failing.id).await.unwrap().status,
        WorkerStatus::Offline
    );
}

#[tokio::test]
async fn test_unreachable_worker_goes_offline_without_aborting_cycle() {
    let stub = StubWorker::spawn().await;

    let registry = Arc::new(WorkerRegistry::new());
    // The unreachable worker is probed first (registration order)
    let gone = registry.insert("gone", &unreachable_url().await).await;
    let live = registry.insert("live", &stub.url).await;

    let monitor = HeartbeatMonitor::new(registry.clone(), &test_coordinator_config());
    monitor.probe_all().await;

    assert_eq!(
        registry.get(&gone.id).await.unwrap().status,
        WorkerStatus::Offline
    );
    assert_eq!(
        registry.get(&live.id).await.unwrap().status,
        WorkerStatus::Online
    );
}

#[tokio::test]
async fn test_probe_cycle_with_empty_registry_is_a_noop() {
    let registry = Arc::new(WorkerRegistry::new());
    let monitor = HeartbeatMonitor::new(registry.clone(), &test_coordinator_config());

    monitor.probe_all().await;

    assert!(registry.is_empty().await);
}
