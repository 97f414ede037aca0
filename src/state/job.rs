//! The job record and its state transitions
//!
//! Transitions are pure: they take the current record by value and return
//! the next record together with the caller-facing output. Nothing here
//! touches the network or the store.

use crate::config::{JobConfig, MAX_CONCURRENCY};
use crate::state::outcome::progress_percent;
use crate::state::{JobPhase, Progress, UrlOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the job transition rules
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Chunk is empty")]
    EmptyChunk,

    #[error("Chunk has {results} outcomes but only {queued} URLs are queued")]
    ChunkTooLarge { results: usize, queued: usize },

    #[error("Outcome {position} is for {found}, expected {expected}")]
    ChunkMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: JobPhase, to: JobPhase },
}

/// Tunable parameters of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    /// Maximum simultaneous in-flight attempts within a chunk
    pub concurrency: usize,

    /// Ceiling of the random wait before a URL's first attempt (milliseconds)
    pub delay_ms: u64,

    /// Retries allowed per URL after the first attempt
    pub max_retries: u32,
}

impl JobParams {
    /// Clamps concurrency into `1..=MAX_CONCURRENCY`
    pub fn normalized(self) -> Self {
        Self {
            concurrency: self.concurrency.clamp(1, MAX_CONCURRENCY),
            ..self
        }
    }
}

impl Default for JobParams {
    fn default() -> Self {
        Self::from(&JobConfig::default())
    }
}

impl From<&JobConfig> for JobParams {
    fn from(config: &JobConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            delay_ms: config.delay_ms,
            max_retries: config.max_retries,
        }
    }
}

/// A batch of URLs searched with one pattern
///
/// Invariants between calls: `completed == history.len()` and
/// `completed + queue.len() == total`. Every stored write bumps `version`,
/// which the store uses for compare-and-swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: String,
    pattern: String,
    params: JobParams,
    queue: Vec<String>,
    history: Vec<UrlOutcome>,
    pending_delta: Vec<UrlOutcome>,
    completed: usize,
    total: usize,
    phase: JobPhase,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a job in the `Created` phase with every URL queued
    ///
    /// Callers validate the pattern and URLs beforehand.
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        params: JobParams,
        urls: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let total = urls.len();
        let phase = if urls.is_empty() {
            JobPhase::Done
        } else {
            JobPhase::Created
        };

        Self {
            id: id.into(),
            pattern: pattern.into(),
            params,
            queue: urls,
            history: Vec::new(),
            pending_delta: Vec::new(),
            completed: 0,
            total,
            phase,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn params(&self) -> JobParams {
        self.params
    }

    /// URLs not yet attempted, in submission order
    pub fn queue(&self) -> &[String] {
        &self.queue
    }

    /// Every outcome recorded so far, in processing order
    pub fn history(&self) -> &[UrlOutcome] {
        &self.history
    }

    /// Outcomes of the most recent chunk
    pub fn pending_delta(&self) -> &[UrlOutcome] {
        &self.pending_delta
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True once the queue is empty
    pub fn is_done(&self) -> bool {
        self.queue.is_empty()
    }

    /// The next URLs to process: a prefix of the queue of at most `chunk_size`
    ///
    /// A chunk size of zero is treated as one.
    pub fn next_chunk(&self, chunk_size: usize) -> Vec<String> {
        let take = chunk_size.max(1).min(self.queue.len());
        self.queue[..take].to_vec()
    }

    /// Records the outcomes of a chunk taken with [`Job::next_chunk`]
    ///
    /// `outcomes` must correspond one-to-one, in order, to a prefix of the
    /// queue. The prefix is removed, the outcomes are appended to the
    /// history and become the pending delta.
    pub fn apply_chunk(
        mut self,
        outcomes: Vec<UrlOutcome>,
        now: DateTime<Utc>,
    ) -> Result<(Self, Progress), JobError> {
        if outcomes.is_empty() {
            return Err(JobError::EmptyChunk);
        }
        if outcomes.len() > self.queue.len() {
            return Err(JobError::ChunkTooLarge {
                results: outcomes.len(),
                queued: self.queue.len(),
            });
        }
        for (position, (outcome, queued)) in outcomes.iter().zip(&self.queue).enumerate() {
            if &outcome.url != queued {
                return Err(JobError::ChunkMismatch {
                    position,
                    expected: queued.clone(),
                    found: outcome.url.clone(),
                });
            }
        }

        self.queue.drain(..outcomes.len());
        let next_phase = if self.queue.is_empty() {
            JobPhase::Done
        } else {
            JobPhase::Running
        };
        if !self.phase.can_transition_to(next_phase) {
            return Err(JobError::InvalidTransition {
                from: self.phase,
                to: next_phase,
            });
        }

        self.history.extend(outcomes.iter().cloned());
        self.pending_delta = outcomes;
        self.completed = self.history.len();
        self.phase = next_phase;
        self.version += 1;
        self.updated_at = now;

        let progress = self.progress();
        Ok((self, progress))
    }

    /// Current counters together with the pending delta
    pub fn progress(&self) -> Progress {
        Progress {
            job_id: self.id.clone(),
            progress_percent: progress_percent(self.completed, self.total),
            completed: self.completed,
            total: self.total,
            new_results: self.pending_delta.clone(),
            done: self.is_done(),
        }
    }

    /// Current counters with an empty delta
    ///
    /// Reported when an advance finds nothing left to do.
    pub fn idle_progress(&self) -> Progress {
        Progress {
            new_results: Vec::new(),
            ..self.progress()
        }
    }

    /// Removes and returns the pending delta
    ///
    /// Called once the delta has been handed to a caller, so no later read
    /// reports the same outcomes as new. The history is untouched.
    pub fn take_delta(&mut self) -> Vec<UrlOutcome> {
        std::mem::take(&mut self.pending_delta)
    }
}
