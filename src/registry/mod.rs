//! Module registry subsystem.
//!
//! # Data Flow
//! ```text
//! startup
//!     → register(descriptor) for every linked module   (available)
//!     → synchronize(): store records ⋈ available         (active)
//!
//! admin action
//!     → install / uninstall / upgrade / update_path
//!     → RecordStore::upsert + snapshot swap (one transaction)
//!     → ChangeNotifier::force_reload
//! ```
//!
//! # Design Decisions
//! - Readers load an immutable `RegistrySnapshot` (arc-swap), no locks
//! - Writers are serialized; setup hooks run before any lock is taken
//! - Uninstall is a status change; records survive for reinstall

pub mod descriptor;
pub mod manager;
pub mod mount;
pub mod snapshot;

use thiserror::Error;

use crate::store::StoreError;

pub use descriptor::{ModuleDescriptor, SetupFuture, SetupHook};
pub use manager::{ModuleRegistry, ModuleView};
pub use mount::{Mount, ROOT_SENTINEL};
pub use snapshot::{ActiveModule, RegistrySnapshot};

/// Failures of registry operations. None of them leave partial state.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Identifier unknown to this binary's catalog.
    #[error("module '{0}' is not registered")]
    NotRegistered(String),

    /// Uninstall/upgrade target is not currently installed.
    #[error("module '{0}' is not installed")]
    NotActive(String),

    /// The install-time setup hook failed.
    #[error("setup for module '{module_id}' failed: {reason}")]
    SetupFailed { module_id: String, reason: String },

    /// The operation needs a persisted record that does not exist.
    #[error("module '{0}' has no persisted record")]
    RecordMissing(String),

    #[error("invalid base path '{path}': {reason}")]
    InvalidBasePath { path: String, reason: &'static str },

    #[error("module registry has been shut down")]
    ShutDown,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
