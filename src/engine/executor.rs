//! Batch executor
//!
//! Runs one chunk of URLs: bounded concurrent fetches with start jitter,
//! retries, and matching. Every input URL yields exactly one outcome; no
//! per-URL failure escapes as an error.

use crate::engine::fetcher::Fetcher;
use crate::engine::identity::IdentityPool;
use crate::engine::retry::{final_error, is_success, RetryPolicy};
use crate::matcher::Pattern;
use crate::state::UrlOutcome;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fetches and matches batches of URLs
#[derive(Clone)]
pub struct BatchExecutor {
    fetcher: Arc<dyn Fetcher>,
    identities: Arc<IdentityPool>,
    retry_backoff: Duration,
}

impl BatchExecutor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        identities: Arc<IdentityPool>,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            fetcher,
            identities,
            retry_backoff,
        }
    }

    /// Processes `urls` and returns one outcome per URL, in input order
    ///
    /// At most `concurrency` attempts are in flight at once; a retried URL
    /// waits for a permit again. First attempts are staggered: each URL
    /// starts a random `[0, delay_ms]` after the one before it. If `pattern`
    /// does not compile, nothing is fetched and every URL gets an
    /// `invalid regex` outcome.
    ///
    /// Dropping the returned future stops waiting for results, but fetches
    /// already spawned run to completion in the background.
    pub async fn run(
        &self,
        urls: &[String],
        pattern: &str,
        concurrency: usize,
        delay_ms: u64,
        max_retries: u32,
    ) -> Vec<UrlOutcome> {
        if urls.is_empty() {
            return Vec::new();
        }

        let pattern = match Pattern::parse(pattern) {
            Ok(pattern) => Arc::new(pattern),
            Err(e) => {
                tracing::warn!("Stored pattern no longer compiles: {}", e);
                return urls.iter().map(UrlOutcome::invalid_regex).collect();
            }
        };

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let policy = RetryPolicy::new(max_retries, self.retry_backoff);
        let mut tasks = DetachOnDrop(JoinSet::new());
        let offsets = start_offsets(urls.len(), delay_ms);

        for (index, (url, offset)) in urls.iter().zip(offsets).enumerate() {
            let worker = Worker {
                fetcher: Arc::clone(&self.fetcher),
                identities: Arc::clone(&self.identities),
                semaphore: Arc::clone(&semaphore),
                pattern: Arc::clone(&pattern),
                policy,
            };
            let url = url.clone();

            tasks.0.spawn(async move {
                if !offset.is_zero() {
                    tokio::time::sleep(offset).await;
                }
                (index, worker.resolve(url).await)
            });
        }

        let mut slots: Vec<Option<UrlOutcome>> = vec![None; urls.len()];
        while let Some(joined) = tasks.0.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!("Fetch task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| slot.unwrap_or_else(|| UrlOutcome::failed(url, 0, "task failed")))
            .collect()
    }
}

/// Cumulative start delays for `count` URLs
///
/// Each offset is the previous one plus a random `[0, delay_ms]`.
fn start_offsets(count: usize, delay_ms: u64) -> Vec<Duration> {
    let mut rng = rand::rng();
    let mut elapsed: u64 = 0;
    (0..count)
        .map(|_| {
            if delay_ms > 0 {
                elapsed += rng.random_range(0..=delay_ms);
            }
            Duration::from_millis(elapsed)
        })
        .collect()
}

/// A task set that detaches its tasks on drop instead of aborting them
struct DetachOnDrop<T: 'static>(JoinSet<T>);

impl<T: 'static> Drop for DetachOnDrop<T> {
    fn drop(&mut self) {
        if !self.0.is_empty() {
            tracing::debug!("Leaving {} fetch tasks running in the background", self.0.len());
        }
        self.0.detach_all();
    }
}

/// Everything one URL's task needs
struct Worker {
    fetcher: Arc<dyn Fetcher>,
    identities: Arc<IdentityPool>,
    semaphore: Arc<Semaphore>,
    pattern: Arc<Pattern>,
    policy: RetryPolicy,
}

impl Worker {
    async fn resolve(self, url: String) -> UrlOutcome {
        let mut attempt = 0;

        loop {
            let result = {
                let _permit = match self.semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return UrlOutcome::failed(url, 0, "executor closed"),
                };
                let identity = self.identities.pick();
                tracing::debug!("Fetching {} (attempt {})", url, attempt + 1);
                self.fetcher.fetch(&url, identity).await
            };

            if self.policy.should_retry(attempt, result.status, &result.error) {
                tracing::warn!(
                    "Retrying {} after attempt {} (status {}, {})",
                    url,
                    attempt + 1,
                    result.status,
                    final_error(result.status, &result.error)
                );
                tokio::time::sleep(self.policy.backoff).await;
                attempt += 1;
                continue;
            }

            if is_success(result.status, &result.error) {
                let matches = self.pattern.find_all(&result.body);
                return UrlOutcome::matched(url, result.status, matches);
            }

            return UrlOutcome::failed(
                url,
                result.status,
                final_error(result.status, &result.error),
            );
        }
    }
}
