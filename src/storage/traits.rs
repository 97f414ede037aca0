//! Storage traits and error types
//!
//! This module defines the trait interface for job stores and the
//! associated error types.

use crate::state::Job;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Version conflict on job {job_id}: expected {expected}, found {found:?}")]
    VersionConflict {
        job_id: String,
        expected: u64,
        found: Option<u64>,
    },

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store holding job records with inactivity expiry
///
/// Implementations must be safe to share between tasks. Expired jobs behave
/// exactly like jobs that never existed.
pub trait JobStore: Send + Sync {
    /// Loads a job, or None when it is missing or expired
    fn get(&self, job_id: &str) -> StoreResult<Option<Job>>;

    /// Writes a job and refreshes its expiry to `ttl` from now
    ///
    /// With `expected_version = None` the job must not exist yet (an expired
    /// record counts as absent). With `Some(v)` the stored record must be
    /// live and at version `v`, otherwise `VersionConflict` is returned and
    /// nothing is written.
    fn set(&self, job: &Job, expected_version: Option<u64>, ttl: Duration) -> StoreResult<()>;

    /// Deletes expired records and returns how many were removed
    fn purge_expired(&self) -> StoreResult<usize>;
}
