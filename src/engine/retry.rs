//! Retry policy for fetch attempts
//!
//! | Condition                         | Action                         |
//! |-----------------------------------|--------------------------------|
//! | No error and status 200..400      | Success, no retry              |
//! | Anything else, budget remaining   | Wait the backoff, try again    |
//! | Anything else, budget exhausted   | Last attempt becomes the result|

use std::time::Duration;

/// Pause before a failed attempt is resubmitted
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// True when an attempt produced a usable page
pub fn is_success(status: u16, error: &str) -> bool {
    error.is_empty() && (200..400).contains(&status)
}

/// Decides whether attempt number `attempt` (0-based) should be retried
pub fn should_retry(attempt: u32, max_retries: u32, status: u16, error: &str) -> bool {
    attempt < max_retries && !is_success(status, error)
}

/// The error recorded for a URL once retries are exhausted
///
/// Transport errors win; otherwise a non-success status becomes
/// `http_<status>`. Successful attempts have no error.
pub fn final_error(status: u16, error: &str) -> String {
    if !error.is_empty() {
        error.to_string()
    } else if !is_success(status, error) {
        format!("http_{}", status)
    } else {
        String::new()
    }
}

/// Retry budget and backoff for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn should_retry(&self, attempt: u32, status: u16, error: &str) -> bool {
        should_retry(attempt, self.max_retries, status, error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, DEFAULT_RETRY_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(is_success(200, ""));
        assert!(is_success(302, ""));
        assert!(is_success(399, ""));
        assert!(!is_success(400, ""));
        assert!(!is_success(199, ""));
        assert!(!is_success(0, ""));
        assert!(!is_success(200, "body: connection reset"));
    }

    #[test]
    fn test_should_retry() {
        // Failures retry while attempts remain
        assert!(should_retry(0, 2, 500, ""));
        assert!(should_retry(1, 2, 0, "timeout: elapsed"));
        assert!(!should_retry(2, 2, 500, ""));

        // Success never retries
        assert!(!should_retry(0, 2, 200, ""));

        // No budget
        assert!(!should_retry(0, 0, 503, ""));
    }

    #[test]
    fn test_final_error() {
        assert_eq!(final_error(404, ""), "http_404");
        assert_eq!(final_error(0, "connect: refused"), "connect: refused");
        assert_eq!(final_error(200, ""), "");
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff, Duration::from_millis(250));
        assert!(policy.should_retry(0, 503, ""));
    }
}
