//! SQLite job store
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::state::Job;
use crate::storage::schema::{get_schema_version, initialize_schema};
use crate::storage::traits::{JobStore, StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite store backend
///
/// The connection sits behind a mutex so one store can be shared by every
/// task of the engine.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a job database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!(
            "Opened job store at {} (schema v{})",
            path.display(),
            get_schema_version()
        );

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_millis(now: i64, ttl: Duration) -> i64 {
    let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.saturating_add(ttl)
}

impl JobStore for SqliteStore {
    fn get(&self, job_id: &str) -> StoreResult<Option<Job>> {
        let conn = self.lock()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM jobs WHERE id = ?1 AND expires_at > ?2",
                params![job_id, now_millis()],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn set(&self, job: &Job, expected_version: Option<u64>, ttl: Duration) -> StoreResult<()> {
        let payload = serde_json::to_string(job)?;
        let now = now_millis();
        let expires_at = expiry_millis(now, ttl);
        let updated_at = job.updated_at().to_rfc3339();
        let conn = self.lock()?;

        match expected_version {
            None => {
                // An expired row with the same id may be overwritten
                let changed = conn.execute(
                    "INSERT INTO jobs (id, version, phase, completed, total, payload, expires_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                        version = excluded.version,
                        phase = excluded.phase,
                        completed = excluded.completed,
                        total = excluded.total,
                        payload = excluded.payload,
                        expires_at = excluded.expires_at,
                        updated_at = excluded.updated_at
                     WHERE jobs.expires_at <= ?9",
                    params![
                        job.id(),
                        job.version() as i64,
                        job.phase().to_db_string(),
                        job.completed() as i64,
                        job.total() as i64,
                        payload,
                        expires_at,
                        updated_at,
                        now,
                    ],
                )?;
                if changed == 0 {
                    return Err(StoreError::AlreadyExists(job.id().to_string()));
                }
            }
            Some(expected) => {
                let changed = conn.execute(
                    "UPDATE jobs SET
                        version = ?1,
                        phase = ?2,
                        completed = ?3,
                        total = ?4,
                        payload = ?5,
                        expires_at = ?6,
                        updated_at = ?7
                     WHERE id = ?8 AND version = ?9 AND expires_at > ?10",
                    params![
                        job.version() as i64,
                        job.phase().to_db_string(),
                        job.completed() as i64,
                        job.total() as i64,
                        payload,
                        expires_at,
                        updated_at,
                        job.id(),
                        expected as i64,
                        now,
                    ],
                )?;
                if changed == 0 {
                    let found: Option<i64> = conn
                        .query_row(
                            "SELECT version FROM jobs WHERE id = ?1 AND expires_at > ?2",
                            params![job.id(), now],
                            |row| row.get(0),
                        )
                        .optional()?;
                    return Err(StoreError::VersionConflict {
                        job_id: job.id().to_string(),
                        expected,
                        found: found.map(|v| v as u64),
                    });
                }
            }
        }

        Ok(())
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM jobs WHERE expires_at <= ?1",
            params![now_millis()],
        )?;
        Ok(removed)
    }
}
