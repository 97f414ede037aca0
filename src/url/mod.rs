//! URL handling module for Regex-Sweep
//!
//! This module turns operator input into URL lists and re-validates URLs
//! before they are accepted into a job.

mod list;
mod validate;

pub use list::parse_url_list;
pub use validate::validate_url;
