//! Route table built from the active modules.
//!
//! # Responsibilities
//! - Bind each active module's router to its URL prefix (or the root)
//! - Rebuild lazily, on the first lookup after an invalidation
//! - Dispatch a request to the bound module with its prefix stripped
//!
//! # Design Decisions
//! - Built tables are immutable and shared through arc-swap
//! - Freshness is a generation number compared against the notifier, so a
//!   burst of admin actions costs one rebuild, not one per action
//! - Prefix bindings win over the root binding; on duplicate prefixes the
//!   first module in identifier order wins and the rest are logged

use arc_swap::ArcSwapOption;
use axum::{
    body::Body,
    http::{Request, Uri},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use crate::http::response::not_found;
use crate::observability::metrics;
use crate::registry::{ModuleRegistry, RegistrySnapshot};
use crate::routing::matcher::{first_segment, strip_segment};

/// One module's routes mounted at a prefix.
#[derive(Clone)]
pub struct RouteBinding {
    pub module_id: String,
    /// `None` when mounted at the application root.
    pub prefix: Option<String>,
    pub router: Router,
}

impl std::fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBinding")
            .field("module_id", &self.module_id)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// An immutable, ordered set of bindings.
#[derive(Debug, Default)]
pub struct BuiltRoutes {
    generation: u64,
    built_at: f64,
    bindings: Vec<RouteBinding>,
    by_prefix: HashMap<String, usize>,
    root: Option<usize>,
}

impl BuiltRoutes {
    /// Derive bindings from the active set of `snapshot`.
    pub fn build(snapshot: &RegistrySnapshot, generation: u64, built_at: f64) -> Self {
        let mut prefixed = Vec::new();
        let mut rooted = Vec::new();
        for (module_id, active) in snapshot.active() {
            let Some(router) = active.descriptor.routes() else {
                continue;
            };
            let binding = RouteBinding {
                module_id: module_id.clone(),
                prefix: active.prefix().map(str::to_string),
                router: router.clone(),
            };
            if binding.prefix.is_some() {
                prefixed.push(binding);
            } else {
                rooted.push(binding);
            }
        }

        let mut by_prefix = HashMap::new();
        let mut bindings = Vec::with_capacity(prefixed.len() + rooted.len());
        for binding in prefixed {
            let Some(prefix) = binding.prefix.clone() else {
                continue;
            };
            if let Some(&winner) = by_prefix.get(&prefix) {
                let winner: &RouteBinding = &bindings[winner];
                tracing::warn!(
                    prefix = %prefix,
                    module_id = %binding.module_id,
                    mounted = %winner.module_id,
                    "Prefix already mounted, module routes shadowed"
                );
                continue;
            }
            by_prefix.insert(prefix, bindings.len());
            bindings.push(binding);
        }

        let root = (!rooted.is_empty()).then_some(bindings.len());
        for (i, binding) in rooted.into_iter().enumerate() {
            if i > 0 {
                tracing::warn!(module_id = %binding.module_id, "Root already mounted, module routes shadowed");
                continue;
            }
            bindings.push(binding);
        }

        Self {
            generation,
            built_at,
            bindings,
            by_prefix,
            root,
        }
    }

    pub fn bindings(&self) -> &[RouteBinding] {
        &self.bindings
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Change stamp observed when this table was built.
    pub fn built_at(&self) -> f64 {
        self.built_at
    }

    /// The binding serving `uri` and the URI as that module sees it.
    pub fn route(&self, uri: &Uri) -> Option<(&RouteBinding, Uri)> {
        let segment = first_segment(uri.path());
        if let Some(&index) = self.by_prefix.get(segment) {
            if let Some(stripped) = strip_segment(uri, segment) {
                return Some((&self.bindings[index], stripped));
            }
        }
        self.root.map(|index| (&self.bindings[index], uri.clone()))
    }
}

/// Lazily rebuilt route table for one process.
pub struct RouteTable {
    registry: Arc<ModuleRegistry>,
    cached: ArcSwapOption<BuiltRoutes>,
}

impl RouteTable {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            cached: ArcSwapOption::const_empty(),
        }
    }

    /// The current table, rebuilding it if the notifier moved on.
    pub fn current(&self) -> Arc<BuiltRoutes> {
        let notifier = self.registry.notifier();
        // Read the generation before the snapshot: the snapshot is then at
        // least as new as the generation recorded with it.
        let generation = notifier.generation();
        if let Some(cached) = self.cached.load_full() {
            if cached.generation == generation {
                return cached;
            }
        }

        let snapshot = self.registry.snapshot();
        let built = Arc::new(BuiltRoutes::build(&snapshot, generation, notifier.last_changed()));
        tracing::debug!(
            generation,
            bindings = built.bindings().len(),
            "Route table rebuilt"
        );
        metrics::record_route_rebuild(built.bindings().len());
        self.cached.store(Some(built.clone()));
        built
    }

    /// Forward `request` to the module bound to its path.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let routes = self.current();
        let Some((binding, uri)) = routes.route(request.uri()) else {
            return not_found();
        };
        let router = binding.router.clone();

        let (mut parts, body) = request.into_parts();
        parts.uri = uri;
        match router.oneshot(Request::from_parts(parts, body)).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}
