//! RegistryHandle - client interface to the registry actor

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::domain::{TaskRecord, TaskView};

use super::messages::{RegistryError, RegistryMetrics, RegistryRequest, TaskInventory};

/// Handle for foreground callers to interact with the registry
///
/// Clone-able; every clone talks to the same actor. All operations are
/// async and resolve once the actor has processed the request.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryRequest>,
}

impl RegistryHandle {
    pub(crate) fn new(tx: mpsc::Sender<RegistryRequest>) -> Self {
        Self { tx }
    }

    /// Create a task and publish its start command
    ///
    /// Fails if the broker rejects the publish; in that case no task is
    /// registered and no partial state is left behind.
    pub async fn create_task(
        &self,
        task_type: impl Into<String>,
        target: Value,
        params: Value,
        project_uuid: impl Into<String>,
    ) -> Result<TaskView, RegistryError> {
        let task_type = task_type.into();
        debug!(%task_type, "RegistryHandle::create_task: called");
        let (reply, reply_rx) = oneshot::channel();

        self.tx
            .send(RegistryRequest::CreateTask {
                task_type,
                target,
                params,
                project_uuid: project_uuid.into(),
                reply,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Snapshot of the (active, finished) record sequences
    pub async fn get_tasks(&self) -> Result<(Vec<TaskRecord>, Vec<TaskRecord>), RegistryError> {
        debug!("RegistryHandle::get_tasks: called");
        let (reply, reply_rx) = oneshot::channel();

        self.tx
            .send(RegistryRequest::GetTasks { reply })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Both partitions as external views, under `active`/`finished` keys
    pub async fn get_tasks_view(&self) -> Result<TaskInventory, RegistryError> {
        debug!("RegistryHandle::get_tasks_view: called");
        let (reply, reply_rx) = oneshot::channel();

        self.tx
            .send(RegistryRequest::GetTasksView { reply })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Current registry metrics
    pub async fn metrics(&self) -> Result<RegistryMetrics, RegistryError> {
        debug!("RegistryHandle::metrics: called");
        let (reply, reply_rx) = oneshot::channel();

        self.tx
            .send(RegistryRequest::GetMetrics { reply })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Request shutdown; the actor finishes in-flight work first
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        debug!("RegistryHandle::shutdown: called");
        self.tx
            .send(RegistryRequest::Shutdown)
            .await
            .map_err(|_| RegistryError::ChannelClosed)
    }
}
