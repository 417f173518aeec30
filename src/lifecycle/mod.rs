//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → store + marker → notifier → registry → register catalog → synchronize
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, monitors exit → registry closed
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_handler};
pub use startup::{bootstrap, bootstrap_with};
