//! Output module for exporting job results
//!
//! This module handles:
//! - Exporting a job's outcomes as CSV
//! - Summarising outcomes into run statistics

mod csv;
pub mod stats;

pub use self::csv::{export_csv, write_csv, CSV_HEADER};
pub use stats::{print_statistics, RunStatistics};
