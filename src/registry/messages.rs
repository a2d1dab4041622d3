//! Message types for the registry actor

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::broker::BrokerError;
use crate::domain::{TaskRecord, TaskView};
use crate::store::StoreError;

/// Errors surfaced through the registry handle
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("registry channel closed")]
    ChannelClosed,
}

/// Both partitions mapped through the external view
#[derive(Debug, Clone, Serialize)]
pub struct TaskInventory {
    pub active: Vec<TaskView>,
    pub finished: Vec<TaskView>,
}

/// Registry observability counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryMetrics {
    /// Tasks currently in the active partition
    pub tasks_active: usize,
    /// Tasks in the finished partition
    pub tasks_finished: usize,
    /// Tasks created through this registry instance
    pub tasks_created: u64,
    /// Status messages received from the broker
    pub statuses_received: u64,
    /// Status messages applied to a known task
    pub statuses_applied: u64,
    /// Status messages dropped because no active task matched
    pub statuses_dropped: u64,
    /// Status messages that failed to decode
    pub decode_failures: u64,
}

/// Requests sent to the registry actor
#[derive(Debug)]
pub enum RegistryRequest {
    /// Create a task and publish its start command
    CreateTask {
        task_type: String,
        target: Value,
        params: Value,
        project_uuid: String,
        reply: oneshot::Sender<Result<TaskView, RegistryError>>,
    },

    /// Snapshot of the (active, finished) record sequences
    GetTasks {
        reply: oneshot::Sender<(Vec<TaskRecord>, Vec<TaskRecord>)>,
    },

    /// Snapshot of both partitions as external views
    GetTasksView { reply: oneshot::Sender<TaskInventory> },

    /// Current metrics
    GetMetrics { reply: oneshot::Sender<RegistryMetrics> },

    /// Stop the actor after finishing in-flight work
    Shutdown,
}
