//! Configuration module for Regex-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use regex_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("regex-sweep.toml")).unwrap();
//! println!("Jobs will run {} fetches at a time", config.job.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ChunkPolicy, Config, FetcherConfig, JobConfig, OutputConfig, StoreConfig};
pub use validation::{MAX_CONCURRENCY, MAX_REDIRECT_LIMIT};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
