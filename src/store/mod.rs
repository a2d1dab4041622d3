//! Store port: the capability the registry needs from persistence
//!
//! A deliberately small contract: list everything, upsert one, look one
//! up. The trait is synchronous and is only called from inside the
//! registry actor, which owns all store access.

use thiserror::Error;

use crate::domain::TaskRecord;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to decode stored record: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Persistence contract for task records
pub trait TaskStore: Send + Sync {
    /// List every known task record.
    fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError>;

    /// Insert or replace a record, keyed by `task_id`.
    fn insert_task(&self, record: &TaskRecord) -> Result<(), StoreError>;

    /// Look up one record by id.
    fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError>;
}
