//! In-process broker with direct-exchange routing
//!
//! Routing keys map to queues the way a durable direct exchange binds
//! them. Messages published before a consumer attaches are buffered and
//! flushed on `consume`. Acks are recorded by tag so tests can assert
//! that the registry acknowledged every processed message.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use super::{Broker, BrokerError, Delivery, STATUS_QUEUE, notification_queue, task_queue};

#[derive(Default)]
struct Inner {
    /// routing key -> queue name (direct exchange bindings)
    bindings: HashMap<String, String>,
    /// queue name -> attached consumer
    consumers: HashMap<String, mpsc::UnboundedSender<Delivery>>,
    /// queue name -> messages published before a consumer attached
    buffered: HashMap<String, Vec<Delivery>>,
    acked: HashSet<u64>,
    next_tag: u64,
}

impl Inner {
    fn bind(&mut self, queue: &str, routing_key: &str) {
        self.bindings.insert(routing_key.to_string(), queue.to_string());
    }
}

/// In-memory [`Broker`] implementation
#[derive(Default)]
pub struct MemoryBroker {
    inner: Mutex<Inner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags acknowledged so far, in no particular order (test support)
    pub async fn acked_tags(&self) -> Vec<u64> {
        let inner = self.inner.lock().await;
        inner.acked.iter().copied().collect()
    }

    /// Number of messages acknowledged so far (test support)
    pub async fn ack_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.acked.len()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn declare_task_topology(&self, task_type: &str) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().await;
        let tasks = task_queue(task_type);
        let notifications = notification_queue(task_type);
        inner.bind(&tasks, &tasks);
        inner.bind(&notifications, &notifications);
        debug!(%task_type, "declared task topology");
        Ok(())
    }

    async fn declare_status_queue(&self) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().await;
        inner.bind(STATUS_QUEUE, STATUS_QUEUE);
        debug!("declared status queue");
        Ok(())
    }

    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().await;

        let queue = inner
            .bindings
            .get(routing_key)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownRoute(routing_key.to_string()))?;

        inner.next_tag += 1;
        let delivery = Delivery {
            delivery_tag: inner.next_tag,
            payload: payload.to_vec(),
        };

        match inner.consumers.get(&queue).cloned() {
            Some(tx) => {
                // Consumer dropped its receiver: treat like a lost channel
                tx.send(delivery).map_err(|_| BrokerError::Closed)?;
            }
            None => {
                inner.buffered.entry(queue).or_default().push(delivery);
            }
        }

        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<mpsc::UnboundedReceiver<Delivery>, BrokerError> {
        let mut inner = self.inner.lock().await;
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(pending) = inner.buffered.remove(queue) {
            for delivery in pending {
                tx.send(delivery).map_err(|_| BrokerError::Closed)?;
            }
        }

        inner.consumers.insert(queue.to_string(), tx);
        debug!(%queue, "consumer attached");
        Ok(rx)
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().await;
        inner.acked.insert(delivery_tag);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_routes_to_bound_queue() {
        let broker = MemoryBroker::new();
        broker.declare_task_topology("scan").await.unwrap();

        let mut rx = broker.consume("scan_tasks").await.unwrap();
        broker.publish("scan_tasks", b"hello").await.unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.payload, b"hello");
    }

    #[tokio::test]
    async fn test_publish_before_consume_is_buffered() {
        let broker = MemoryBroker::new();
        broker.declare_status_queue().await.unwrap();

        broker.publish(STATUS_QUEUE, b"one").await.unwrap();
        broker.publish(STATUS_QUEUE, b"two").await.unwrap();

        let mut rx = broker.consume(STATUS_QUEUE).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().payload, b"one");
        assert_eq!(rx.recv().await.unwrap().payload, b"two");
    }

    #[tokio::test]
    async fn test_unbound_routing_key_is_an_error() {
        let broker = MemoryBroker::new();
        let err = broker.publish("nope_tasks", b"x").await.unwrap_err();
        assert!(matches!(err, BrokerError::UnknownRoute(_)));
    }

    #[tokio::test]
    async fn test_topology_declaration_is_idempotent() {
        let broker = MemoryBroker::new();
        broker.declare_task_topology("scan").await.unwrap();
        broker.declare_task_topology("scan").await.unwrap();

        let mut rx = broker.consume("scan_notifications").await.unwrap();
        broker.publish("scan_notifications", b"n").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().payload, b"n");
    }

    #[tokio::test]
    async fn test_acks_are_recorded_once() {
        let broker = MemoryBroker::new();
        broker.declare_status_queue().await.unwrap();
        let mut rx = broker.consume(STATUS_QUEUE).await.unwrap();

        broker.publish(STATUS_QUEUE, b"m").await.unwrap();
        let delivery = rx.recv().await.unwrap();

        broker.ack(delivery.delivery_tag).await.unwrap();
        broker.ack(delivery.delivery_tag).await.unwrap();

        assert_eq!(broker.ack_count().await, 1);
        assert_eq!(broker.acked_tags().await, vec![delivery.delivery_tag]);
    }
}
