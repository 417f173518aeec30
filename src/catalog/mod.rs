//! Modules linked into this binary.
//!
//! Each module contributes a descriptor: metadata, an optional setup hook
//! run on install, and the routes it serves once installed. Routes are
//! written relative to the module's base path.

pub mod blog;
pub mod shop;
pub mod wiki;

use crate::registry::ModuleDescriptor;

/// Every built-in module, in registration order.
pub fn builtin_catalog() -> Vec<ModuleDescriptor> {
    vec![blog::descriptor(), shop::descriptor(), wiki::descriptor()]
}
