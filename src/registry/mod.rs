//! Task registry: the single-writer actor owning the active/finished
//! partition and the status-consuming loop

mod config;
mod core;
mod handle;
mod messages;

pub use config::RegistryConfig;
pub use self::core::{ChangeSink, TaskRegistry};
pub use handle::RegistryHandle;
pub use messages::{RegistryError, RegistryMetrics, RegistryRequest, TaskInventory};
