//! TaskRecord domain type
//!
//! The durable shape of one broker-dispatched task, plus its status enum
//! and the external view handed to callers outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Task status as reported by workers
///
/// Only `Finished` and `Aborted` carry meaning for the registry (they
/// trigger the active -> finished transition). Everything else a worker
/// reports passes through opaquely via `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// Worker completed the task
    Finished,
    /// Worker gave up or was told to stop
    Aborted,
    /// Any non-terminal status string (e.g. "Pending", "Running")
    Other(String),
}

impl TaskStatus {
    /// True for the statuses that move a task out of the active partition
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Finished | Self::Aborted => true,
            Self::Other(_) => false,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Finished" => Self::Finished,
            "Aborted" => Self::Aborted,
            _ => Self::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finished => write!(f, "Finished"),
            Self::Aborted => write!(f, "Aborted"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// The durable/serializable shape of one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique identifier, immutable for the life of the task
    pub task_id: String,

    /// Routing namespace: selects both the command queue and the worker
    pub task_type: String,

    /// What the task operates on (opaque structured payload)
    pub target: Value,

    /// Task parameters (opaque structured payload)
    pub params: Value,

    /// Owning project
    pub project_uuid: String,

    /// Last reported status, None until the first status update arrives
    #[serde(default)]
    pub status: Option<TaskStatus>,

    /// Caller-defined progress indicator, opaque to the registry
    #[serde(default)]
    pub progress: Value,

    /// Human-readable status text
    #[serde(default)]
    pub text: Option<String>,

    /// Set once at construction, never mutated
    pub date_added: DateTime<Utc>,

    /// Accumulated worker stdout, append-only
    #[serde(default)]
    pub stdout: String,

    /// Accumulated worker stderr, append-only
    #[serde(default)]
    pub stderr: String,
}

impl TaskRecord {
    /// Create a fresh record with a generated id and unset status
    pub fn new(
        task_type: impl Into<String>,
        target: Value,
        params: Value,
        project_uuid: impl Into<String>,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            target,
            params,
            project_uuid: project_uuid.into(),
            status: None,
            progress: Value::Null,
            text: None,
            date_added: Utc::now(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// True once the task has reported a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(TaskStatus::is_terminal)
    }

    /// External view of this record: everything except the log bodies
    pub fn view(&self) -> TaskView {
        TaskView {
            task_id: self.task_id.clone(),
            task_type: self.task_type.clone(),
            target: self.target.clone(),
            params: self.params.clone(),
            project_uuid: self.project_uuid.clone(),
            status: self.status.clone(),
            progress: self.progress.clone(),
            text: self.text.clone(),
            date_added: self.date_added.to_rfc3339(),
        }
    }
}

/// External view of a task
///
/// Deliberately has no stdout/stderr fields: log bodies can be
/// arbitrarily large and are an operational detail, not part of the
/// task's public shape. `date_added` is rendered as RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub task_id: String,
    pub task_type: String,
    pub target: Value,
    pub params: Value,
    pub project_uuid: String,
    pub status: Option<TaskStatus>,
    pub progress: Value,
    pub text: Option<String>,
    pub date_added: String,
}
