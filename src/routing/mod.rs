//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RegistrySnapshot.active
//!     → router.rs (BuiltRoutes: prefix → module router)
//!     → dispatch (strip prefix, call module router)
//!
//! Invalidation:
//!     local mutation  → ChangeNotifier generation bump → lazy rebuild
//!     other process   → durable marker → reload.rs poll → registry resync
//! ```
//!
//! # Design Decisions
//! - Tables are rebuilt on demand, never per mutation
//! - No regex in the hot path (first segment lookup only)
//! - Deterministic: identifier order decides prefix conflicts

pub mod matcher;
pub mod reload;
pub mod router;

pub use reload::ReloadMonitor;
pub use router::{BuiltRoutes, RouteBinding, RouteTable};
