//! Vec-backed TaskStore for tests and the default daemon config

use std::sync::Mutex;

use super::{StoreError, TaskStore};
use crate::domain::TaskRecord;

/// In-memory [`TaskStore`]
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<TaskRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with records (test support)
    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl TaskStore for MemoryStore {
    fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.clone())
    }

    fn insert_task(&self, record: &TaskRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        match records.iter_mut().find(|r| r.task_id == record.task_id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.iter().find(|r| r.task_id == task_id).cloned())
    }
}
