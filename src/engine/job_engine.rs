//! Job engine - the job state machine service
//!
//! The engine owns no job state between calls. Every operation loads the
//! job from the store, applies a pure transition, and writes it back with a
//! version check, so any number of processes can share one store.

use crate::config::{ChunkPolicy, Config};
use crate::engine::executor::BatchExecutor;
use crate::engine::fetcher::Fetcher;
use crate::engine::identity::IdentityPool;
use crate::engine::retry::DEFAULT_RETRY_BACKOFF;
use crate::matcher::Pattern;
use crate::state::{Job, JobParams, Progress, UrlOutcome};
use crate::storage::{JobStore, StoreError};
use crate::url::validate_url;
use crate::{Result, SweepError};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex as AsyncMutex;

static JOB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Engine-wide settings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Inactivity window after which the store forgets a job
    pub ttl: Duration,

    /// Pause before a failed attempt is resubmitted
    pub retry_backoff: Duration,

    /// User-agents to rotate through; empty means the built-in pool
    pub user_agents: Vec<String>,

    /// Chunk size used by [`JobEngine::default_chunk_size`]
    pub chunk_policy: ChunkPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ttl: Duration::from_secs(config.store.ttl_secs),
            retry_backoff: Duration::from_millis(config.fetcher.retry_backoff_ms),
            user_agents: config.fetcher.user_agents.clone(),
            chunk_policy: config.job.chunk_policy,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            user_agents: Vec::new(),
            chunk_policy: ChunkPolicy::default(),
        }
    }
}

/// Creates, advances and reads jobs
///
/// Construct one per process and share it; it is cheap to clone behind an
/// `Arc`.
pub struct JobEngine {
    store: Arc<dyn JobStore>,
    executor: BatchExecutor,
    settings: EngineSettings,
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl JobEngine {
    pub fn new(store: Arc<dyn JobStore>, fetcher: Arc<dyn Fetcher>, settings: EngineSettings) -> Self {
        let identities = Arc::new(IdentityPool::new(settings.user_agents.clone()));
        let executor = BatchExecutor::new(fetcher, identities, settings.retry_backoff);

        Self {
            store,
            executor,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Validates the input and persists a new job
    ///
    /// Fails with `InvalidInput` when `urls` is empty, when the pattern is
    /// empty or does not compile, or when any URL is not an absolute
    /// http(s) URL. Nothing is fetched. Repeated URLs are queued once.
    pub fn create_job(&self, urls: Vec<String>, pattern: &str, params: JobParams) -> Result<String> {
        if urls.is_empty() {
            return Err(SweepError::InvalidInput("no URLs supplied".to_string()));
        }
        if let Err(e) = Pattern::parse(pattern) {
            return Err(SweepError::InvalidInput(format!("invalid pattern: {}", e)));
        }
        for url in &urls {
            if let Err(e) = validate_url(url) {
                return Err(SweepError::InvalidInput(format!("invalid URL: {}", e)));
            }
        }

        let submitted = urls.len();
        let mut seen = HashSet::new();
        let urls: Vec<String> = urls
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();
        if urls.len() < submitted {
            tracing::info!(
                "Dropped {} repeated URLs from submission",
                submitted - urls.len()
            );
        }

        let params = params.normalized();
        let job_id = generate_job_id();
        let job = Job::new(job_id.clone(), pattern, params, urls, Utc::now());
        self.store.set(&job, None, self.settings.ttl)?;

        tracing::info!(
            "Created job {} with {} URLs (concurrency {}, delay {}ms, retries {})",
            job_id,
            job.total(),
            params.concurrency,
            params.delay_ms,
            params.max_retries
        );

        Ok(job_id)
    }

    /// Processes the next chunk of up to `chunk_size` URLs
    ///
    /// Blocks until every URL of the chunk is resolved. On a finished job
    /// this is a no-op that reports `done` with an empty delta. Overlapping
    /// calls for one job id are serialized within this process; across
    /// processes the losing write fails with `Conflict` and its chunk is
    /// discarded. Dropping the future leaves spawned fetches running, but
    /// their outcomes are never written to the job.
    pub async fn advance(&self, job_id: &str, chunk_size: usize) -> Result<Progress> {
        let lock = self.job_lock(job_id);
        let _guard = lock.lock().await;

        let job = self.load_job(job_id)?;
        if job.is_done() {
            tracing::debug!("Job {} has nothing left to do", job_id);
            return Ok(job.idle_progress());
        }

        let chunk = job.next_chunk(chunk_size);
        let params = job.params();
        let outcomes = self
            .executor
            .run(
                &chunk,
                job.pattern(),
                params.concurrency,
                params.delay_ms,
                params.max_retries,
            )
            .await;

        let expected = job.version();
        let (mut next, progress) = job.apply_chunk(outcomes, Utc::now())?;
        // The delta leaves with this return value; the stored job keeps none
        next.take_delta();

        match self.store.set(&next, Some(expected), self.settings.ttl) {
            Ok(()) => {}
            Err(StoreError::VersionConflict { found: None, .. }) => {
                tracing::warn!("Job {} expired while a chunk was running", job_id);
                return Err(SweepError::JobNotFound {
                    job_id: job_id.to_string(),
                });
            }
            Err(StoreError::VersionConflict {
                expected, found, ..
            }) => {
                tracing::warn!(
                    "Job {} changed underneath us (expected v{}, found {:?}); discarding chunk",
                    job_id,
                    expected,
                    found
                );
                return Err(SweepError::Conflict {
                    job_id: job_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            "Job {}: {}/{} ({:.2}%), {} new",
            job_id,
            progress.completed,
            progress.total,
            progress.progress_percent,
            progress.new_results.len()
        );

        Ok(progress)
    }

    /// Like [`JobEngine::advance`], but reports a missing job as finished
    pub async fn poll(&self, job_id: &str, chunk_size: usize) -> Result<Progress> {
        match self.advance(job_id, chunk_size).await {
            Err(e) if e.is_not_found() => {
                tracing::info!("Job {} is gone; treating it as finished", job_id);
                Ok(Progress::expired(job_id))
            }
            other => other,
        }
    }

    /// Current counters, without doing any work
    ///
    /// Every delta is returned by the `advance` that produced it, so the
    /// snapshot's `new_results` is empty.
    pub fn snapshot(&self, job_id: &str) -> Result<Progress> {
        Ok(self.load_job(job_id)?.progress())
    }

    /// Every outcome recorded so far
    ///
    /// Works on unfinished jobs too; the result then covers only the URLs
    /// processed so far.
    pub fn finalize(&self, job_id: &str) -> Result<Vec<UrlOutcome>> {
        let job = self.load_job(job_id)?;
        tracing::info!(
            "Finalizing job {} with {}/{} outcomes",
            job_id,
            job.completed(),
            job.total()
        );
        Ok(job.history().to_vec())
    }

    /// Loads a job or fails with `JobNotFound`
    pub fn load_job(&self, job_id: &str) -> Result<Job> {
        self.store
            .get(job_id)?
            .ok_or_else(|| SweepError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    /// Chunk size the configured policy gives for `job`
    pub fn default_chunk_size(&self, job: &Job) -> usize {
        self.settings.chunk_policy.chunk_size(job.params().concurrency)
    }

    /// Removes expired jobs from the store
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_expired()?;
        if removed > 0 {
            tracing::debug!("Purged {} expired jobs", removed);
        }
        Ok(removed)
    }

    fn job_lock(&self, job_id: &str) -> Arc<AsyncMutex<()>> {
        // The map only holds weak handles, so a poisoned guard is still usable
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = locks.get(job_id).and_then(Weak::upgrade) {
            return lock;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(job_id.to_string(), Arc::downgrade(&lock));
        lock
    }
}

/// Generates an opaque `job_<16 hex>` identifier
pub fn generate_job_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let counter = JOB_COUNTER.fetch_add(1, Ordering::Relaxed);
    let salt: u64 = rand::rng().random();

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(counter.to_le_bytes());
    hasher.update(salt.to_le_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("job_{}", &digest[..16])
}
