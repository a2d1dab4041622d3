//! TaskRegistry actor implementation
//!
//! The actor owns the authoritative active/finished partition and is the
//! single writer for it. Foreground operations arrive as requests over a
//! channel; the status consumer is driven by the same loop through
//! `tokio::select!`, so neither side ever observes the partitions in a
//! half-updated state.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broker::{Broker, Delivery, STATUS_QUEUE, connect_with_retry};
use crate::domain::{StatusUpdate, TaskHandle, TaskRecord, TaskView};
use crate::store::TaskStore;

use super::config::RegistryConfig;
use super::handle::RegistryHandle;
use super::messages::{RegistryError, RegistryMetrics, RegistryRequest, TaskInventory};

/// Fire-and-forget sink for "this data domain changed" tokens
pub type ChangeSink = mpsc::UnboundedSender<String>;

/// Mutable actor state: the partitions and everything needed to serve them
struct RegistryCore {
    config: RegistryConfig,
    broker: Arc<dyn Broker>,
    store: Arc<dyn TaskStore>,
    change_tx: ChangeSink,
    active: Vec<TaskHandle>,
    finished: Vec<TaskHandle>,
    metrics: RegistryMetrics,
}

impl RegistryCore {
    /// Create a task, publish its start command, then register it
    ///
    /// The handle is appended to `active` only after a successful publish,
    /// so a broker failure leaves no partial state behind.
    async fn create_task(
        &mut self,
        task_type: String,
        target: Value,
        params: Value,
        project_uuid: String,
    ) -> Result<TaskView, RegistryError> {
        let handle = TaskHandle::new(task_type, target, params, project_uuid);

        handle.declare_topology(self.broker.as_ref()).await?;
        handle.send_start_command(self.broker.as_ref()).await?;

        if let Err(e) = self.store.insert_task(handle.record()) {
            warn!(task_id = %handle.task_id(), error = %e, "failed to persist new task");
        }

        info!(task_id = %handle.task_id(), task_type = %handle.task_type(), "task created");
        let view = handle.view();
        self.active.push(handle);
        self.metrics.tasks_created += 1;
        Ok(view)
    }

    /// Cloned snapshots of both partitions
    fn snapshot(&self) -> (Vec<TaskRecord>, Vec<TaskRecord>) {
        (
            self.active.iter().map(|h| h.record().clone()).collect(),
            self.finished.iter().map(|h| h.record().clone()).collect(),
        )
    }

    /// Both partitions mapped through the external view
    fn inventory(&self) -> TaskInventory {
        TaskInventory {
            active: self.active.iter().map(TaskHandle::view).collect(),
            finished: self.finished.iter().map(TaskHandle::view).collect(),
        }
    }

    fn metrics(&self) -> RegistryMetrics {
        let mut metrics = self.metrics.clone();
        metrics.tasks_active = self.active.len();
        metrics.tasks_finished = self.finished.len();
        metrics
    }

    /// Process one status message, then acknowledge it unconditionally
    async fn on_status(&mut self, delivery: Delivery) {
        self.metrics.statuses_received += 1;

        match serde_json::from_slice::<StatusUpdate>(&delivery.payload) {
            Err(e) => {
                // Unrecoverable message: acked below so it never blocks the queue
                warn!(error = %e, "dropping undecodable status message");
                self.metrics.decode_failures += 1;
            }
            Ok(update) => self.apply_update(update),
        }

        if let Err(e) = self.broker.ack(delivery.delivery_tag).await {
            warn!(error = %e, "failed to ack status message");
        }
    }

    fn apply_update(&mut self, update: StatusUpdate) {
        let Some(idx) = self.active.iter().position(|h| h.task_id() == update.task_id) else {
            // Stale or unknown id: an explicit drop policy, not an error.
            // Covers duplicates of terminal messages and updates racing a
            // not-yet-registered creation.
            debug!(task_id = %update.task_id, "status for unknown task dropped");
            self.metrics.statuses_dropped += 1;
            return;
        };

        self.active[idx].apply_status(&update);
        self.metrics.statuses_applied += 1;
        debug!(task_id = %update.task_id, status = %update.status, "status applied");

        if self.active[idx].is_terminal() {
            let handle = self.active.remove(idx);
            info!(task_id = %handle.task_id(), status = %update.status, "task reached terminal status");

            if let Err(e) = self.store.insert_task(handle.record()) {
                warn!(task_id = %handle.task_id(), error = %e, "failed to persist terminal task");
            }
            self.finished.push(handle);

            for token in &self.config.change_tokens {
                let _ = self.change_tx.send(token.clone());
            }
        }
    }
}

/// The registry actor: owns the task partitions and the status consumer
pub struct TaskRegistry {
    tx: mpsc::Sender<RegistryRequest>,
    rx: mpsc::Receiver<RegistryRequest>,
    statuses: mpsc::UnboundedReceiver<Delivery>,
    core: RegistryCore,
}

impl TaskRegistry {
    /// Construct the registry: declare the status queue (with bounded
    /// retry), attach the consumer, and bootstrap the partitions from
    /// the store.
    ///
    /// Bootstrap never re-publishes start commands; it only reconstructs
    /// the in-memory shadows of records whose commands were sent in a
    /// prior process lifetime. A store read failure is fatal.
    pub async fn new(
        config: RegistryConfig,
        broker: Arc<dyn Broker>,
        store: Arc<dyn TaskStore>,
        change_tx: ChangeSink,
    ) -> Result<Self, RegistryError> {
        connect_with_retry(config.connect_attempts, config.connect_backoff(), || {
            let broker = broker.clone();
            async move { broker.declare_status_queue().await }
        })
        .await?;

        let statuses = broker.consume(STATUS_QUEUE).await?;

        let mut active = Vec::new();
        let mut finished = Vec::new();
        for record in store.list_tasks()? {
            let handle = TaskHandle::from_record(record);
            if handle.is_terminal() {
                finished.push(handle);
            } else {
                active.push(handle);
            }
        }
        info!(
            active = active.len(),
            finished = finished.len(),
            "bootstrapped tasks from store"
        );

        let (tx, rx) = mpsc::channel(config.channel_buffer);

        Ok(Self {
            tx,
            rx,
            statuses,
            core: RegistryCore {
                config,
                broker,
                store,
                change_tx,
                active,
                finished,
                metrics: RegistryMetrics::default(),
            },
        })
    }

    /// Get a clone-able handle for foreground callers
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle::new(self.tx.clone())
    }

    /// Run the registry task
    ///
    /// Consumes the registry and runs until shutdown is requested or both
    /// channels close. Messages are processed one at a time, in delivery
    /// order; shutdown lets the in-flight message finish first.
    pub async fn run(self) {
        let Self {
            tx: _tx,
            mut rx,
            mut statuses,
            mut core,
        } = self;

        info!("task registry started");

        loop {
            tokio::select! {
                req = rx.recv() => match req {
                    Some(RegistryRequest::CreateTask { task_type, target, params, project_uuid, reply }) => {
                        let result = core.create_task(task_type, target, params, project_uuid).await;
                        let _ = reply.send(result);
                    }
                    Some(RegistryRequest::GetTasks { reply }) => {
                        let _ = reply.send(core.snapshot());
                    }
                    Some(RegistryRequest::GetTasksView { reply }) => {
                        let _ = reply.send(core.inventory());
                    }
                    Some(RegistryRequest::GetMetrics { reply }) => {
                        let _ = reply.send(core.metrics());
                    }
                    Some(RegistryRequest::Shutdown) | None => {
                        info!("task registry shutting down");
                        break;
                    }
                },
                delivery = statuses.recv() => match delivery {
                    Some(delivery) => core.on_status(delivery).await,
                    None => {
                        warn!("status consumer closed, stopping registry");
                        break;
                    }
                },
            }
        }

        info!("task registry stopped");
    }
}
