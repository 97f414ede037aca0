//! Per-URL outcomes and progress reports

use serde::{Deserialize, Serialize};

/// Error text recorded when the stored pattern no longer compiles
pub const INVALID_REGEX: &str = "invalid regex";

/// Outcome of fetching and matching one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlOutcome {
    /// The URL that was fetched
    pub url: String,

    /// Final HTTP status, 0 when no response was received
    pub http_status: u16,

    /// Failure description; empty when the fetch succeeded
    pub error: String,

    /// Distinct matches in first-seen order
    pub matches: Vec<String>,
}

impl UrlOutcome {
    pub fn matched(url: impl Into<String>, http_status: u16, matches: Vec<String>) -> Self {
        Self {
            url: url.into(),
            http_status,
            error: String::new(),
            matches,
        }
    }

    pub fn failed(url: impl Into<String>, http_status: u16, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_status,
            error: error.into(),
            matches: Vec::new(),
        }
    }

    pub fn invalid_regex(url: impl Into<String>) -> Self {
        Self::failed(url, 0, INVALID_REGEX)
    }

    /// True when no error was recorded and the status is 2xx or 3xx
    pub fn is_success(&self) -> bool {
        self.error.is_empty() && (200..400).contains(&self.http_status)
    }
}

/// Progress report returned to a polling caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub job_id: String,

    /// `completed / total` as a percentage rounded to two decimals
    pub progress_percent: f64,

    pub completed: usize,
    pub total: usize,

    /// Outcomes produced by the most recent chunk only
    pub new_results: Vec<UrlOutcome>,

    pub done: bool,
}

impl Progress {
    /// Report for a job the store no longer holds
    ///
    /// An evicted job is reported as finished with nothing new to show.
    pub fn expired(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            progress_percent: 100.0,
            completed: 0,
            total: 0,
            new_results: Vec::new(),
            done: true,
        }
    }
}

/// Computes `100 * completed / total` rounded to two decimals
///
/// A job with nothing to do is 100% complete.
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let percent = 100.0 * completed as f64 / total as f64;
    (percent * 100.0).round() / 100.0
}
