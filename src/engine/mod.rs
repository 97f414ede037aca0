//! Engine module - fetching, retrying and job orchestration
//!
//! # Components
//!
//! - `fetcher`: single-attempt HTTP fetches behind the `Fetcher` trait
//! - `identity`: user-agent rotation
//! - `retry`: retry decisions and backoff
//! - `executor`: bounded-concurrency processing of one chunk
//! - `job_engine`: the job state machine service polled by callers

mod executor;
mod fetcher;
mod identity;
mod job_engine;
mod retry;

#[cfg(test)]
mod test_support;

pub use executor::BatchExecutor;
pub use fetcher::{build_http_client, describe_error, FetchResult, FetchSettings, Fetcher, ReqwestFetcher};
pub use identity::{IdentityPool, DEFAULT_USER_AGENTS};
pub use job_engine::{generate_job_id, EngineSettings, JobEngine};
pub use retry::{final_error, is_success, should_retry, RetryPolicy, DEFAULT_RETRY_BACKOFF};
