//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / gate / route table
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout log stream
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
