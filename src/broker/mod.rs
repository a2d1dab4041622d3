//! Broker port: the capability the registry needs from a message broker
//!
//! Modeled on AMQP direct-exchange routing with manual acknowledgment.
//! The registry only ever talks to the `Broker` trait; `MemoryBroker` is
//! the in-process implementation used by tests and the demo daemon.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

mod memory;

pub use memory::MemoryBroker;

/// The single direct exchange shared by all task types
pub const TASKS_EXCHANGE: &str = "tasks.exchange";

/// The well-known queue carrying every worker's status messages
pub const STATUS_QUEUE: &str = "tasks_statuses";

/// Command queue name for a task type
pub fn task_queue(task_type: &str) -> String {
    format!("{task_type}_tasks")
}

/// Notification queue name for a task type (worker-side, not consumed here)
pub fn notification_queue(task_type: &str) -> String {
    format!("{task_type}_notifications")
}

/// Errors from broker operations
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable after {attempts} attempts: {reason}")]
    Unavailable { attempts: u32, reason: String },

    #[error("no queue bound for routing key: {0}")]
    UnknownRoute(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("broker connection closed")]
    Closed,
}

/// One message pulled from a queue, pending manual acknowledgment
///
/// Acknowledge by passing `delivery_tag` to [`Broker::ack`] after
/// processing, mirroring AMQP basic_ack semantics.
#[derive(Debug)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub payload: Vec<u8>,
}

/// Abstract broker capability: declare topology, publish, consume, ack
///
/// All declarations are durable in intent and idempotent, so repeating
/// them per handle or per process start is safe.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Declare the `"{T}_tasks"` and `"{T}_notifications"` queues for a
    /// task type, bound under [`TASKS_EXCHANGE`] with routing keys equal
    /// to the queue names.
    async fn declare_task_topology(&self, task_type: &str) -> Result<(), BrokerError>;

    /// Declare the shared [`STATUS_QUEUE`] binding.
    async fn declare_status_queue(&self) -> Result<(), BrokerError>;

    /// Publish a payload to a routing key on the shared exchange.
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Start consuming a queue with manual acknowledgment.
    ///
    /// Messages published before the consumer attached are delivered
    /// first, in publish order.
    async fn consume(&self, queue: &str) -> Result<mpsc::UnboundedReceiver<Delivery>, BrokerError>;

    /// Acknowledge a delivery by tag. Each delivery is acked at most once.
    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError>;
}

/// Retry a fallible async connect/declare step with bounded linear backoff
///
/// Surfaces `BrokerError::Unavailable` once all attempts are spent,
/// so startup fails with a distinct error kind instead of crashing on the
/// first refused connection.
pub async fn connect_with_retry<T, F, Fut>(
    attempts: u32,
    backoff: Duration,
    mut connect: F,
) -> Result<T, BrokerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BrokerError>>,
{
    let mut last_reason = String::new();

    for attempt in 1..=attempts.max(1) {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, error = %e, "broker connect attempt failed");
                last_reason = e.to_string();
            }
        }
        if attempt < attempts {
            tokio::time::sleep(backoff * attempt).await;
        }
    }

    Err(BrokerError::Unavailable {
        attempts: attempts.max(1),
        reason: last_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_queue_naming() {
        assert_eq!(task_queue("scan"), "scan_tasks");
        assert_eq!(notification_queue("scan"), "scan_notifications");
        assert_eq!(STATUS_QUEUE, "tasks_statuses");
    }

    #[tokio::test]
    async fn test_connect_with_retry_succeeds_eventually() {
        let calls = AtomicU32::new(0);

        let result = connect_with_retry(5, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(BrokerError::Closed)
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_connect_with_retry_exhausted() {
        let result: Result<(), _> = connect_with_retry(3, Duration::from_millis(1), || async {
            Err(BrokerError::Closed)
        })
        .await;

        match result {
            Err(BrokerError::Unavailable { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
