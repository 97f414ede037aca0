//! Storage module for persisting jobs
//!
//! Jobs are stored whole under their id with an inactivity expiry. Writes
//! are compare-and-swap on the job's version so that two overlapping
//! advances of one job can never both land.
//!
//! - `SqliteStore`: durable store used by the CLI
//! - `MemoryStore`: in-process store for tests and embedding

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{JobStore, StoreError, StoreResult};

use std::path::Path;

/// Opens the job database at `path`, creating it if needed
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::new(path)
}
