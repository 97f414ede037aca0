//! Statistics over a job's outcomes
//!
//! This module summarises a finished (or partially finished) job's history
//! and prints the summary after a run.

use crate::state::UrlOutcome;
use std::collections::HashMap;

/// Run statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    /// Number of outcomes summarised
    pub total_urls: usize,

    /// URLs fetched successfully (status 200..400, no error)
    pub succeeded: usize,

    /// URLs that ended in an error
    pub failed: usize,

    /// Successful URLs with at least one match
    pub with_matches: usize,

    /// Sum of distinct matches across all URLs
    pub total_matches: usize,

    /// Failure category -> count
    pub error_summary: HashMap<String, usize>,
}

impl RunStatistics {
    pub fn from_results(results: &[UrlOutcome]) -> Self {
        let mut stats = Self {
            total_urls: results.len(),
            ..Self::default()
        };

        for outcome in results {
            if outcome.is_success() {
                stats.succeeded += 1;
                if !outcome.matches.is_empty() {
                    stats.with_matches += 1;
                }
            } else {
                stats.failed += 1;
                *stats
                    .error_summary
                    .entry(error_category(&outcome.error).to_string())
                    .or_insert(0) += 1;
            }
            stats.total_matches += outcome.matches.len();
        }

        stats
    }
}

/// The leading kind of an error string: `timeout`, `http_404`, `invalid regex`
fn error_category(error: &str) -> &str {
    match error.split_once(':') {
        Some((kind, _)) => kind.trim(),
        None if error.is_empty() => "unknown",
        None => error,
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Run Statistics ===\n");

    println!("Overview:");
    println!("  URLs processed: {}", stats.total_urls);
    println!("  Fetched successfully: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);
    println!("  URLs with matches: {}", stats.with_matches);
    println!("  Total matches: {}", stats.total_matches);
    println!();

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (category, count) in error_counts {
            println!("  {}: {}", category, count);
        }
        println!();
    }

    let success_rate = if stats.total_urls > 0 {
        (stats.succeeded as f64 / stats.total_urls as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} URLs fetched)",
        success_rate, stats.succeeded, stats.total_urls
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_from_results() {
        let results = vec![
            UrlOutcome::matched("https://a.test/", 200, vec!["x".into(), "y".into()]),
            UrlOutcome::matched("https://b.test/", 200, vec![]),
            UrlOutcome::failed("https://c.test/", 404, "http_404"),
            UrlOutcome::failed("https://d.test/", 0, "timeout: operation timed out"),
            UrlOutcome::failed("https://e.test/", 0, "timeout: operation timed out"),
        ];

        let stats = RunStatistics::from_results(&results);

        assert_eq!(stats.total_urls, 5);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.with_matches, 1);
        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.error_summary.get("timeout"), Some(&2));
        assert_eq!(stats.error_summary.get("http_404"), Some(&1));
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(RunStatistics::from_results(&[]), RunStatistics::default());
    }
}
