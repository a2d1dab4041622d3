//! TaskHandle - in-process shadow of one remote task
//!
//! Wraps a TaskRecord with its broker-facing behavior: topology
//! declaration, start command publishing, and status application.

use serde_json::Value;
use tracing::debug;

use crate::broker::{Broker, BrokerError, task_queue};

use super::task::{TaskRecord, TaskStatus, TaskView};
use super::wire::{StartCommand, StatusUpdate};

/// In-process representation mirroring a task's remote state
#[derive(Debug, Clone)]
pub struct TaskHandle {
    record: TaskRecord,
}

impl TaskHandle {
    /// Create a handle for a brand new task (fresh id, unset status)
    pub fn new(
        task_type: impl Into<String>,
        target: Value,
        params: Value,
        project_uuid: impl Into<String>,
    ) -> Self {
        Self {
            record: TaskRecord::new(task_type, target, params, project_uuid),
        }
    }

    /// Rehydrate a handle from a stored record, reusing its id and fields
    pub fn from_record(record: TaskRecord) -> Self {
        Self { record }
    }

    /// This handle's task id
    pub fn task_id(&self) -> &str {
        &self.record.task_id
    }

    /// This handle's task type
    pub fn task_type(&self) -> &str {
        &self.record.task_type
    }

    /// The underlying record
    pub fn record(&self) -> &TaskRecord {
        &self.record
    }

    /// Declare the routing topology for this handle's task type
    ///
    /// Safe to repeat: queue and binding declarations are idempotent.
    pub async fn declare_topology(&self, broker: &dyn Broker) -> Result<(), BrokerError> {
        debug!(task_type = %self.record.task_type, "declare_topology: called");
        broker.declare_task_topology(&self.record.task_type).await
    }

    /// Publish the start command for this task to `"{task_type}_tasks"`
    pub async fn send_start_command(&self, broker: &dyn Broker) -> Result<(), BrokerError> {
        debug!(task_id = %self.record.task_id, task_type = %self.record.task_type, "send_start_command: called");
        let command = StartCommand {
            task_id: self.record.task_id.clone(),
            target: self.record.target.clone(),
            params: self.record.params.clone(),
            project_uuid: self.record.project_uuid.clone(),
        };

        let payload =
            serde_json::to_vec(&command).map_err(|e| BrokerError::Publish(e.to_string()))?;
        broker.publish(&task_queue(&self.record.task_type), &payload).await
    }

    /// Apply one status delta: overwrite status/progress/text, append logs
    pub fn apply_status(&mut self, update: &StatusUpdate) {
        self.record.status = Some(update.status.clone());
        self.record.progress = update.progress.clone();
        self.record.text = Some(update.text.clone());
        self.record.stdout.push_str(&update.new_stdout);
        self.record.stderr.push_str(&update.new_stderr);
    }

    /// Read-only (status, progress, text) snapshot
    pub fn status(&self) -> (Option<&TaskStatus>, &Value, Option<&str>) {
        (
            self.record.status.as_ref(),
            &self.record.progress,
            self.record.text.as_deref(),
        )
    }

    /// True once the task has reported Finished or Aborted
    pub fn is_terminal(&self) -> bool {
        self.record.is_terminal()
    }

    /// External view of this task (no log bodies)
    pub fn view(&self) -> TaskView {
        self.record.view()
    }
}
