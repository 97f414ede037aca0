//! Scripted fetcher shared by the engine unit tests

use crate::engine::fetcher::{FetchResult, Fetcher};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Replays canned results per URL and records what it was asked
///
/// URLs without a script answer `200` with an empty body. When a script
/// runs out its last result repeats.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<FetchResult>>>,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    finished: AtomicUsize,
    latency: Duration,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn script(&self, url: &str, results: Vec<FetchResult>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), results.into());
    }

    pub fn page(&self, url: &str, body: &str) {
        self.script(url, vec![FetchResult::response(200, body)]);
    }

    /// Number of attempts made for `url`
    pub fn attempts(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .count()
    }

    pub fn total_attempts(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Identities presented, in call order
    pub fn identities(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, identity)| identity.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Attempts that ran to the end of their latency
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, identity: &str) -> FetchResult {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), identity.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);

        let mut scripts = self.scripts.lock().unwrap();
        let next = match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        next.unwrap_or_else(|| FetchResult::response(200, ""))
    }
}
