//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: admin API plus a fallback into the route table
//! - Wire up middleware (request ID, tracing, timeout, concurrency, gate)
//! - Bind server to listener and serve until shutdown
//! - Run background tasks: cross-process reload monitor, config updates

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GatewayConfig;
use crate::gate::{gate_middleware, GateSettings, ModuleGate};
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::registry::ModuleRegistry;
use crate::routing::{ReloadMonitor, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModuleRegistry>,
    pub gate: Arc<ModuleGate>,
    pub routes: Arc<RouteTable>,
}

/// HTTP server fronting the installed modules.
pub struct GatewayServer {
    router: Router,
    state: AppState,
    config: GatewayConfig,
    config_updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
}

impl GatewayServer {
    /// Create a new server over an already synchronized registry.
    pub fn new(config: GatewayConfig, registry: Arc<ModuleRegistry>) -> Self {
        let gate = Arc::new(ModuleGate::new(
            registry.clone(),
            GateSettings::from_config(&config.gate),
        ));
        let routes = Arc::new(RouteTable::new(registry.clone()));
        let state = AppState {
            registry,
            gate,
            routes,
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            state,
            config,
            config_updates: None,
        }
    }

    /// Apply gate settings from reloaded configurations.
    pub fn with_config_updates(mut self, updates: mpsc::UnboundedReceiver<GatewayConfig>) -> Self {
        self.config_updates = Some(updates);
        self
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new();
        if config.admin.enabled {
            router = router.merge(setup_admin_router(AdminState::new(
                state.registry.clone(),
                state.routes.clone(),
                &config.admin.api_key,
            )));
        }

        router
            .fallback(dispatch_handler)
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(state.gate, gate_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener, until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Arc<Shutdown>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let monitor = ReloadMonitor::new(
            self.state.registry.clone(),
            Duration::from_secs(self.config.reload.check_interval_secs),
        );
        tokio::spawn(monitor.run(shutdown.subscribe()));

        if let Some(updates) = self.config_updates {
            tokio::spawn(apply_config_updates(
                self.state.gate.clone(),
                updates,
                shutdown.subscribe(),
            ));
        }

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        self.state.registry.shutdown();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward everything the admin API does not own to the active modules.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    tracing::trace!(
        request_id = request_id(&request).unwrap_or("unknown"),
        path = %request.uri().path(),
        "Dispatching to module routes"
    );
    state.routes.dispatch(request).await
}

async fn apply_config_updates(
    gate: Arc<ModuleGate>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else {
                    break;
                };
                gate.update_settings(GateSettings::from_config(&config.gate));
                tracing::info!(
                    allowed_modules = ?config.gate.allowed_modules,
                    core_paths = ?config.gate.core_paths,
                    "Gate settings reloaded"
                );
            }
            _ = shutdown.recv() => break,
        }
    }
}
