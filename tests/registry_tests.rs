//! Tests for the worker registry: registration, liveness transitions, and
//! load counters.

use taskgrid::coordinator::{WorkerRegistry, WorkerStatus};

#[tokio::test]
async fn test_insert_creates_online_worker() {
    let registry = WorkerRegistry::new();

    let record = registry.insert("alpha", "http://127.0.0.1:9001").await;

    assert_eq!(record.id, "alpha-0");
    assert_eq!(record.name, "alpha");
    assert_eq!(record.url, "http://127.0.0.1:9001");
    assert_eq!(record.status, WorkerStatus::Online);
    assert_eq!(record.tasks_assigned, 0);
    assert_eq!(record.registered_at, record.last_heartbeat);
}

#[tokio::test]
async fn test_insert_strips_trailing_slash() {
    let registry = WorkerRegistry::new();

    let record = registry.insert("alpha", "http://127.0.0.1:9001/").await;

    assert_eq!(record.url, "http://127.0.0.1:9001");
}

#[tokio::test]
async fn test_ids_are_unique_for_same_name() {
    let registry = WorkerRegistry::new();

    let first = registry.insert("worker", "http://127.0.0.1:9001").await;
    let second = registry.insert("worker", "http://127.0.0.1:9002").await;

    assert_ne!(first.id, second.id);
    assert_eq!(first.id, "worker-0");
    assert_eq!(second.id, "worker-1");
}

#[tokio::test]
async fn test_list_preserves_registration_order() {
    let registry = WorkerRegistry::new();

    registry.insert("a", "http://127.0.0.1:9001").await;
    registry.insert("b", "http://127.0.0.1:9002").await;
    registry.insert("c", "http://127.0.0.1:9003").await;

    let workers = registry.list().await;
    assert_eq!(workers.len(), 3);
    assert_eq!(workers[0].name, "a");
    assert_eq!(workers[1].name, "b");
    assert_eq!(workers[2].name, "c");
}

#[tokio::test]
async fn test_list_has_no_duplicates() {
    let registry = WorkerRegistry::new();

    for i in 0..5 {
        registry
            .insert("worker", &format!("http://127.0.0.1:900{}", i))
            .await;
    }

    let workers = registry.list().await;
    let mut ids: Vec<String> = workers.iter().map(|w| w.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn test_mark_offline_and_online() {
    let registry = WorkerRegistry::new();
    let record = registry.insert("alpha", "http://127.0.0.1:9001").await;

    registry.mark_offline(&record.id).await;
    let offline = registry.get(&record.id).await.unwrap();
    assert_eq!(offline.status, WorkerStatus::Offline);

    registry.mark_online(&record.id).await;
    let online = registry.get(&record.id).await.unwrap();
    assert_eq!(online.status, WorkerStatus::Online);
}

#[tokio::test]
async fn test_mark_online_refreshes_heartbeat() {
    let registry = WorkerRegistry::new();
    let record = registry.insert("alpha", "http://127.0.0.1:9001").await;

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    registry.mark_online(&record.id).await;

    let refreshed = registry.get(&record.id).await.unwrap();
    assert!(refreshed.last_heartbeat > record.last_heartbeat);
}

#[tokio::test]
async fn test_mark_offline_is_idempotent() {
    let registry = WorkerRegistry::new();
    let record = registry.insert("alpha", "http://127.0.0.1:9001").await;

    registry.mark_offline(&record.id).await;
    registry.mark_offline(&record.id).await;

    let worker = registry.get(&record.id).await.unwrap();
    assert_eq!(worker.status, WorkerStatus::Offline);
}

#[tokio::test]
async fn test_liveness_ops_ignore_unknown_ids() {
    let registry = WorkerRegistry::new();
    registry.insert("alpha", "http://127.0.0.1:9001").await;

    registry.mark_offline("missing-99").await;
    registry.mark_online("missing-99").await;
    registry.record_assignment("missing-99").await;

    assert_eq!(registry.len().await, 1);
    assert!(registry.get("missing-99").await.is_none());
}

#[tokio::test]
async fn test_record_assignment_is_monotonic() {
    let registry = WorkerRegistry::new();
    let record = registry.insert("alpha", "http://127.0.0.1:9001").await;

    for _ in 0..3 {
        registry.record_assignment(&record.id).await;
    }

    let worker = registry.get(&record.id).await.unwrap();
    assert_eq!(worker.tasks_assigned, 3);

    // Liveness transitions never touch the counter
    registry.mark_offline(&record.id).await;
    registry.mark_online(&record.id).await;
    let worker = registry.get(&record.id).await.unwrap();
    assert_eq!(worker.tasks_assigned, 3);
}

#[tokio::test]
async fn test_online_count() {
    let registry = WorkerRegistry::new();
    let a = registry.insert("a", "http://127.0.0.1:9001").await;
    registry.insert("b", "http://127.0.0.1:9002").await;

    assert_eq!(registry.online_count().await, 2);

    registry.mark_offline(&a.id).await;
    assert_eq!(registry.online_count().await, 1);
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn test_offline_worker_stays_listed() {
    let registry = WorkerRegistry::new();
    let record = registry.insert("alpha", "http://127.0.0.1:9001").await;

    registry.mark_offline(&record.id).await;

    let workers = registry.list().await;
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].status, WorkerStatus::Offline);
}

#[tokio::test]
async fn test_concurrent_registration_mints_distinct_ids() {
    use std::sync::Arc;

    let registry = Arc::new(WorkerRegistry::new());
    let mut handles = Vec::new();

    for i in 0..10 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry
                .insert("worker", &format!("http://127.0.0.1:91{:02}", i))
                .await
                .id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}
