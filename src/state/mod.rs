//! State module for tracking job progress
//!
//! This module provides the job record and the values it produces.
//!
//! # Components
//!
//! - `Job`: the persisted record (queue, history, pending delta, counters)
//! - `JobPhase`: lifecycle phase (created, running, done)
//! - `UrlOutcome`: the outcome recorded for one URL
//! - `Progress`: what a polling caller receives

mod job;
mod job_phase;
mod outcome;

// Re-export main types
pub use job::{Job, JobError, JobParams};
pub use job_phase::JobPhase;
pub use outcome::{progress_percent, Progress, UrlOutcome, INVALID_REGEX};
