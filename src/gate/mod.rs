//! Request gate.
//!
//! # Decision Flow
//! ```text
//! first path segment
//!     → bypass list?                      → Bypass (no registry lookup)
//!     → custom prefix of an active module → Allow
//!     → allow-list check                  → Deny(NotRegistered) | PassThrough
//!     → registered but not active         → Deny(NotInstalled)
//!     → not registered                    → PassThrough
//!     → active                            → Allow
//! ```
//!
//! # Design Decisions
//! - Denials surface as a plain 404, identical to a path nothing serves
//! - Unknown segments are not assumed to be modules; they fall through
//! - Settings are swapped whole on config reload

pub mod middleware;

use arc_swap::ArcSwap;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::config::GateConfig;
use crate::registry::{ModuleRegistry, RegistrySnapshot};
use crate::routing::matcher::first_segment;

pub use middleware::gate_middleware;

/// Prefixes that always bypass the gate: admin UI, module management,
/// static assets, media and authentication.
pub const CORE_PATHS: &[&str] = &["admin", "module", "static", "media", "accounts"];

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateDenial {
    /// Registered module that is not installed.
    #[error("module '{0}' is not installed")]
    NotInstalled(String),

    /// Allow-listed identifier whose code is not linked into this build.
    #[error("module '{0}' is not available")]
    NotRegistered(String),
}

impl GateDenial {
    pub fn reason(&self) -> &'static str {
        match self {
            GateDenial::NotInstalled(_) => "not_installed",
            GateDenial::NotRegistered(_) => "not_registered",
        }
    }
}

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Core path, no module lookup happened.
    Bypass,
    /// Addressed an installed module.
    Allow { module_id: String },
    /// Not identifiable as a module; left to the rest of the pipeline.
    PassThrough,
    Deny(GateDenial),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, GateDecision::Deny(_))
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            GateDecision::Bypass => "bypass",
            GateDecision::Allow { .. } => "allow",
            GateDecision::PassThrough => "pass_through",
            GateDecision::Deny(_) => "deny",
        }
    }
}

/// Bypass prefixes and the optional module allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    bypass: Vec<String>,
    allow_list: Option<BTreeSet<String>>,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self::new(&[], None)
    }
}

impl GateSettings {
    /// Fixed core paths followed by `extra_bypass`, in order.
    pub fn new(extra_bypass: &[String], allow_list: Option<&[String]>) -> Self {
        let mut bypass: Vec<String> = CORE_PATHS.iter().map(|p| p.to_string()).collect();
        for prefix in extra_bypass {
            let prefix = prefix.trim_matches('/').to_string();
            if !prefix.is_empty() && !bypass.contains(&prefix) {
                bypass.push(prefix);
            }
        }
        Self {
            bypass,
            allow_list: allow_list.map(|ids| ids.iter().cloned().collect()),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(&config.core_paths, config.allowed_modules.as_deref())
    }

    pub fn bypass(&self) -> &[String] {
        &self.bypass
    }

    pub fn allow_list(&self) -> Option<&BTreeSet<String>> {
        self.allow_list.as_ref()
    }

    pub fn is_bypassed(&self, segment: &str) -> bool {
        self.bypass.iter().any(|p| p == segment)
    }
}

/// Decide for a non-bypassed segment against a registry snapshot.
pub fn decide_segment(snapshot: &RegistrySnapshot, settings: &GateSettings, segment: &str) -> GateDecision {
    if let Some(module_id) = snapshot.resolve_prefix(segment) {
        return GateDecision::Allow {
            module_id: module_id.to_string(),
        };
    }

    let registered = snapshot.is_available(segment);
    if let Some(allow_list) = settings.allow_list() {
        let listed = allow_list.contains(segment);
        if !registered && listed {
            return GateDecision::Deny(GateDenial::NotRegistered(segment.to_string()));
        }
        if registered && !listed {
            return GateDecision::PassThrough;
        }
    }

    if !registered {
        return GateDecision::PassThrough;
    }
    if !snapshot.is_active(segment) {
        return GateDecision::Deny(GateDenial::NotInstalled(segment.to_string()));
    }
    GateDecision::Allow {
        module_id: segment.to_string(),
    }
}

/// Per-request gate over a shared registry.
pub struct ModuleGate {
    registry: Arc<ModuleRegistry>,
    settings: ArcSwap<GateSettings>,
}

impl ModuleGate {
    pub fn new(registry: Arc<ModuleRegistry>, settings: GateSettings) -> Self {
        Self {
            registry,
            settings: ArcSwap::from_pointee(settings),
        }
    }

    pub fn settings(&self) -> Arc<GateSettings> {
        self.settings.load_full()
    }

    /// Replace bypass list and allow-list, e.g. after a config reload.
    pub fn update_settings(&self, settings: GateSettings) {
        tracing::info!(
            bypass = ?settings.bypass(),
            allow_list = ?settings.allow_list(),
            "Gate settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    pub fn decide(&self, path: &str) -> GateDecision {
        let segment = first_segment(path);
        let settings = self.settings.load();
        if settings.is_bypassed(segment) {
            return GateDecision::Bypass;
        }
        let snapshot = self.registry.snapshot();
        decide_segment(&snapshot, &settings, segment)
    }
}
