//! Module record storage.
//!
//! # Data Flow
//! ```text
//! ModuleRegistry mutation
//!     → RecordStore::upsert (one record per module identifier)
//!
//! Startup / cross-process refresh
//!     → RecordStore::filter(Installed)
//!     → reconciliation against the compiled-in catalog
//! ```
//!
//! # Design Decisions
//! - Keyed by module identifier; uniqueness comes from the key, not a check
//! - Records are never deleted; uninstall is a status change
//! - `get` returns `Ok(None)` for a missing record, errors are reserved for
//!   an unreachable or corrupt backing store

pub mod file_lock;
pub mod json_file;
pub mod memory;
pub mod record;

use thiserror::Error;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::{now_millis, ModuleRecord, ModuleStatus};

/// Errors raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store has not been initialized or cannot be reached.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed.
    #[error("record store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds data that does not decode as module records.
    #[error("record store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed storage for per-module state.
pub trait RecordStore: Send + Sync {
    /// Fetch the record for `module_id`, `None` if it was never installed.
    fn get(&self, module_id: &str) -> StoreResult<Option<ModuleRecord>>;

    /// Insert or replace the record keyed by `record.module_id`.
    fn upsert(&self, record: ModuleRecord) -> StoreResult<()>;

    /// All records currently in `status`, ordered by identifier.
    fn filter(&self, status: ModuleStatus) -> StoreResult<Vec<ModuleRecord>>;
}
