//! Domain types for taskmirror
//!
//! TaskRecord is the durable shape of one task; TaskHandle wraps it with
//! broker-facing behavior; the wire module holds the payloads exchanged
//! with workers.

mod handle;
mod task;
mod wire;

pub use handle::TaskHandle;
pub use task::{TaskRecord, TaskStatus, TaskView};
pub use wire::{StartCommand, StatusUpdate};
