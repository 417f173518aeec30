//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → gate middleware (deny uninstalled modules)
//!     → admin API, or the route table for everything else
//!     → response.rs (not found, admin outcomes)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{not_found, OperationOutcome};
pub use server::{AppState, GatewayServer};
