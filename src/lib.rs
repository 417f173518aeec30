//! Module Gateway Library
//!
//! Serves a catalog of statically linked feature modules, each reachable
//! only while it is marked installed.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod notifier;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod store;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use registry::{ModuleDescriptor, ModuleRegistry, RegistryError};
