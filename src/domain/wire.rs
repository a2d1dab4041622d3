//! Wire payloads exchanged with workers over the broker

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::TaskStatus;

/// Published to `"{task_type}_tasks"` to tell a worker to start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartCommand {
    pub task_id: String,
    pub target: Value,
    pub params: Value,
    pub project_uuid: String,
}

/// Consumed from `"tasks_statuses"`; one delta in a task's status stream
///
/// `new_stdout`/`new_stderr` are deltas to append, never full replacements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Value,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub new_stdout: String,
    #[serde(default)]
    pub new_stderr: String,
}
