//! taskmirror - task lifecycle tracker for broker-dispatched worker tasks
//!
//! taskmirror keeps an in-process mirror of asynchronously executed work
//! items ("tasks") that are dispatched to external worker processes
//! through a message broker. Workers report status deltas back on a
//! shared queue; the registry reconciles each delta with its shadow of
//! the task and partitions everything into active and finished sets.
//!
//! # Core Concepts
//!
//! - **Shadow, not source of truth**: workers own execution; the registry
//!   mirrors their reported state by task id
//! - **Single-writer actor**: one tokio task owns the partitions and
//!   drives both foreground requests and the status consumer
//! - **Terminal is one-way**: `Finished`/`Aborted` move a task from
//!   active to finished exactly once; later messages for it are dropped
//! - **Ports at the seams**: broker and store are traits, so the core is
//!   testable with in-memory implementations
//!
//! # Modules
//!
//! - [`domain`] - TaskRecord, TaskHandle, status enum, wire payloads
//! - [`broker`] - broker port, topology naming, in-memory broker
//! - [`store`] - store port, in-memory and SQLite implementations
//! - [`registry`] - the registry actor and its handle
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod broker;
pub mod cli;
pub mod config;
pub mod domain;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use broker::{Broker, BrokerError, Delivery, MemoryBroker, STATUS_QUEUE, TASKS_EXCHANGE};
pub use config::{Config, StorageConfig};
pub use domain::{StartCommand, StatusUpdate, TaskHandle, TaskRecord, TaskStatus, TaskView};
pub use registry::{
    ChangeSink, RegistryConfig, RegistryError, RegistryHandle, RegistryMetrics, RegistryRequest, TaskInventory,
    TaskRegistry,
};
pub use store::{MemoryStore, SqliteStore, StoreError, TaskStore};
