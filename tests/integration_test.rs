//! Integration tests for taskmirror
//!
//! These tests verify end-to-end behavior of the registry against the
//! in-memory broker and the SQLite store, including restart/bootstrap.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use taskmirror::broker::{Broker, MemoryBroker, STATUS_QUEUE, task_queue};
use taskmirror::domain::{StartCommand, TaskStatus};
use taskmirror::registry::{RegistryConfig, TaskRegistry};
use taskmirror::store::{SqliteStore, TaskStore};
use tempfile::TempDir;

fn status_payload(task_id: &str, status: &str, progress: i64, text: &str, out: &str, err: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "task_id": task_id,
        "status": status,
        "progress": progress,
        "text": text,
        "new_stdout": out,
        "new_stderr": err,
    }))
    .expect("payload encodes")
}

// =============================================================================
// Full lifecycle
// =============================================================================

#[tokio::test]
async fn test_full_task_lifecycle_over_sqlite() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("tasks.db");

    let broker = Arc::new(MemoryBroker::new());
    let store = Arc::new(SqliteStore::open(&db_path).expect("Failed to open store"));
    let (change_tx, mut change_rx) = mpsc::unbounded_channel();

    let registry = TaskRegistry::new(RegistryConfig::default(), broker.clone(), store.clone(), change_tx)
        .await
        .expect("Failed to build registry");
    let handle = registry.handle();
    let registry_task = tokio::spawn(registry.run());

    // A "worker" listens on the scan command queue
    broker.declare_task_topology("scan").await.expect("declare");
    let mut worker_rx = broker.consume(&task_queue("scan")).await.expect("consume");

    // Create a task; the start command must reach the worker
    let view = handle
        .create_task("scan", json!({"host": "10.0.0.1"}), json!({"ports": "1-1024"}), "p1")
        .await
        .expect("create_task");

    let delivery = worker_rx.recv().await.expect("start command delivered");
    let command: StartCommand = serde_json::from_slice(&delivery.payload).expect("decodes");
    assert_eq!(command.task_id, view.task_id);
    assert_eq!(command.project_uuid, "p1");

    // Worker streams status: running, then finished
    broker
        .publish(STATUS_QUEUE, &status_payload(&view.task_id, "Running", 50, "halfway", "a", ""))
        .await
        .expect("publish running");
    broker
        .publish(STATUS_QUEUE, &status_payload(&view.task_id, "Finished", 100, "done", "b", ""))
        .await
        .expect("publish finished");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (active, finished) = handle.get_tasks().await.expect("get_tasks");
    assert!(active.is_empty());
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].status, Some(TaskStatus::Finished));
    assert_eq!(finished[0].stdout, "ab");

    // Terminal transition pushed one token per affected domain
    assert_eq!(change_rx.recv().await, Some("scan".to_string()));
    assert_eq!(change_rx.recv().await, Some("file".to_string()));

    // Both status messages were acknowledged
    assert_eq!(broker.ack_count().await, 2);

    // The terminal state made it into the store
    let stored = store.get_task(&view.task_id).expect("get_task").expect("present");
    assert_eq!(stored.status, Some(TaskStatus::Finished));
    assert_eq!(stored.stdout, "ab");

    handle.shutdown().await.expect("shutdown");
    tokio::time::timeout(Duration::from_secs(5), registry_task)
        .await
        .expect("registry should shut down gracefully")
        .expect("no panic");
}

// =============================================================================
// Restart / bootstrap
// =============================================================================

#[tokio::test]
async fn test_restart_bootstraps_previous_partition() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("tasks.db");

    let finished_id;
    let active_id;

    // First process lifetime: one task finishes, one stays active
    {
        let broker = Arc::new(MemoryBroker::new());
        let store = Arc::new(SqliteStore::open(&db_path).expect("open store"));
        let (change_tx, _change_rx) = mpsc::unbounded_channel();

        let registry = TaskRegistry::new(RegistryConfig::default(), broker.clone(), store, change_tx)
            .await
            .expect("build registry");
        let handle = registry.handle();
        let task = tokio::spawn(registry.run());

        let done = handle
            .create_task("scan", json!({"host": "a"}), json!({}), "p1")
            .await
            .expect("create");
        let pending = handle
            .create_task("dirsearch", json!({"host": "b"}), json!({}), "p1")
            .await
            .expect("create");
        finished_id = done.task_id.clone();
        active_id = pending.task_id.clone();

        broker
            .publish(STATUS_QUEUE, &status_payload(&done.task_id, "Finished", 100, "done", "", ""))
            .await
            .expect("publish");
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.shutdown().await.expect("shutdown");
        task.await.expect("no panic");
    }

    // Second process lifetime: fresh broker, same store
    let broker = Arc::new(MemoryBroker::new());
    let store = Arc::new(SqliteStore::open(&db_path).expect("reopen store"));
    let (change_tx, _change_rx) = mpsc::unbounded_channel();

    let registry = TaskRegistry::new(RegistryConfig::default(), broker.clone(), store, change_tx)
        .await
        .expect("rebuild registry");
    let handle = registry.handle();
    tokio::spawn(registry.run());

    let (active, finished) = handle.get_tasks().await.expect("get_tasks");
    assert_eq!(active.len(), 1);
    assert_eq!(finished.len(), 1);
    assert_eq!(active[0].task_id, active_id);
    assert_eq!(finished[0].task_id, finished_id);

    // Bootstrap must not have re-published any start command
    broker.declare_task_topology("dirsearch").await.expect("declare");
    let mut worker_rx = broker.consume(&task_queue("dirsearch")).await.expect("consume");
    assert!(worker_rx.try_recv().is_err());

    // The still-active task keeps receiving statuses after restart
    broker
        .publish(STATUS_QUEUE, &status_payload(&active_id, "Aborted", 0, "gone", "", "boom"))
        .await
        .expect("publish");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (active, finished) = handle.get_tasks().await.expect("get_tasks");
    assert!(active.is_empty());
    assert_eq!(finished.len(), 2);
}

// =============================================================================
// External view
// =============================================================================

#[tokio::test]
async fn test_inventory_views_hide_logs() {
    let broker = Arc::new(MemoryBroker::new());
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(SqliteStore::open(temp_dir.path().join("tasks.db")).expect("open store"));
    let (change_tx, _change_rx) = mpsc::unbounded_channel();

    let registry = TaskRegistry::new(RegistryConfig::default(), broker.clone(), store, change_tx)
        .await
        .expect("build registry");
    let handle = registry.handle();
    tokio::spawn(registry.run());

    let view = handle
        .create_task("scan", json!({"host": "10.0.0.1"}), json!({}), "p1")
        .await
        .expect("create");

    broker
        .publish(
            STATUS_QUEUE,
            &status_payload(&view.task_id, "Running", 10, "starting", "big stdout blob", "big stderr blob"),
        )
        .await
        .expect("publish");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let inventory = handle.get_tasks_view().await.expect("view");
    let value = serde_json::to_value(&inventory).expect("encodes");

    assert_eq!(value["active"].as_array().map(Vec::len), Some(1));
    assert!(value["active"][0].get("stdout").is_none());
    assert!(value["active"][0].get("stderr").is_none());
    assert_eq!(value["active"][0]["status"], "Running");
    assert!(value["finished"].as_array().map(Vec::len) == Some(0));
}
