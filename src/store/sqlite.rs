//! SQLite-backed TaskStore
//!
//! One `tasks` table. `target`, `params`, and `progress` are stored as
//! JSON text and decoded on read; `date_added` is RFC 3339 text. Inserts
//! upsert by `task_id` so a terminal transition can overwrite the row the
//! creation wrote.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tracing::debug;

use super::{StoreError, TaskStore};
use crate::domain::{TaskRecord, TaskStatus};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    task_id      TEXT PRIMARY KEY,
    task_type    TEXT NOT NULL,
    target       TEXT NOT NULL,
    params       TEXT NOT NULL,
    project_uuid TEXT NOT NULL,
    status       TEXT,
    progress     TEXT NOT NULL DEFAULT 'null',
    text         TEXT,
    date_added   TEXT NOT NULL,
    stdout       TEXT NOT NULL DEFAULT '',
    stderr       TEXT NOT NULL DEFAULT ''
)";

/// SQLite [`TaskStore`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        debug!(path = %path.display(), "opened sqlite task store");

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (test support)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn row_to_record(row: &Row<'_>) -> Result<TaskRecord, StoreError> {
    let target: String = row.get("target")?;
    let params: String = row.get("params")?;
    let progress: String = row.get("progress")?;
    let status: Option<String> = row.get("status")?;
    let date_added: String = row.get("date_added")?;

    Ok(TaskRecord {
        task_id: row.get("task_id")?,
        task_type: row.get("task_type")?,
        target: serde_json::from_str(&target).map_err(|e| StoreError::Decode(e.to_string()))?,
        params: serde_json::from_str(&params).map_err(|e| StoreError::Decode(e.to_string()))?,
        project_uuid: row.get("project_uuid")?,
        status: status.map(TaskStatus::from),
        progress: serde_json::from_str(&progress).map_err(|e| StoreError::Decode(e.to_string()))?,
        text: row.get("text")?,
        date_added: DateTime::parse_from_rfc3339(&date_added)
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .with_timezone(&Utc),
        stdout: row.get("stdout")?,
        stderr: row.get("stderr")?,
    })
}

impl TaskStore for SqliteStore {
    fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT task_id, task_type, target, params, project_uuid,
                    status, progress, text, date_added, stdout, stderr
             FROM tasks ORDER BY date_added",
        )?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    fn insert_task(&self, record: &TaskRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let target = serde_json::to_string(&record.target).map_err(|e| StoreError::Decode(e.to_string()))?;
        let params = serde_json::to_string(&record.params).map_err(|e| StoreError::Decode(e.to_string()))?;
        let progress = serde_json::to_string(&record.progress).map_err(|e| StoreError::Decode(e.to_string()))?;

        conn.execute(
            "INSERT INTO tasks (task_id, task_type, target, params, project_uuid,
                                status, progress, text, date_added, stdout, stderr)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(task_id) DO UPDATE SET
                 status = excluded.status,
                 progress = excluded.progress,
                 text = excluded.text,
                 stdout = excluded.stdout,
                 stderr = excluded.stderr",
            params![
                record.task_id,
                record.task_type,
                target,
                params,
                record.project_uuid,
                record.status.as_ref().map(ToString::to_string),
                progress,
                record.text,
                record.date_added.to_rfc3339(),
                record.stdout,
                record.stderr,
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT task_id, task_type, target, params, project_uuid,
                    status, progress, text, date_added, stdout, stderr
             FROM tasks WHERE task_id = ?1",
        )?;

        let mut rows = stmt.query(params![task_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }
}
