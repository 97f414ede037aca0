//! Regex-Sweep: a resumable fetch-and-match job engine
//!
//! This crate fetches batches of URLs, searches each page's raw source with a
//! user-supplied regular expression and records a per-URL outcome. Jobs live in
//! a key-value store and are advanced one chunk at a time by independent,
//! stateless calls, so a caller can poll a job to completion across requests
//! or processes.

pub mod config;
pub mod engine;
pub mod matcher;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Regex-Sweep operations
///
/// Only structural failures surface here. Per-URL problems (transport
/// errors, HTTP failures, a pattern that stops compiling mid-job) are
/// recorded in [`state::UrlOutcome::error`] and never fail a chunk.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Job not found or expired: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Job {job_id} was modified concurrently; chunk discarded")]
    Conflict { job_id: String },

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Job state error: {0}")]
    Job(#[from] state::JobError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    /// Returns true when the job is missing from the store
    ///
    /// Callers treat this as "already done": stores evict idle jobs, and an
    /// evicted job has nothing left to report.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{url}': {reason}")]
    Parse { url: String, reason: String },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Regex-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use engine::{EngineSettings, JobEngine};
pub use matcher::Pattern;
pub use state::{Job, JobParams, JobPhase, Progress};
pub use storage::{JobStore, MemoryStore, SqliteStore};
