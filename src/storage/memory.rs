//! In-process job store

use crate::state::Job;
use crate::storage::traits::{JobStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Entry {
    job: Job,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Job store kept in memory, for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl JobStore for MemoryStore {
    fn get(&self, job_id: &str) -> StoreResult<Option<Job>> {
        let now = Instant::now();
        let entries = self.lock()?;
        Ok(entries
            .get(job_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.job.clone()))
    }

    fn set(&self, job: &Job, expected_version: Option<u64>, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let current = entries
            .get(job.id())
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.job.version());

        match (expected_version, current) {
            (None, Some(_)) => return Err(StoreError::AlreadyExists(job.id().to_string())),
            (None, None) => {}
            (Some(expected), Some(found)) if expected == found => {}
            (Some(expected), found) => {
                return Err(StoreError::VersionConflict {
                    job_id: job.id().to_string(),
                    expected,
                    found,
                })
            }
        }

        entries.insert(
            job.id().to_string(),
            Entry {
                job: job.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(before - entries.len())
    }
}
