//! Module Gateway
//!
//! Runtime module manager in front of a set of statically linked modules.
//!
//! # Architecture Overview
//!
//! ```text
//!   admin action ──▶ /admin API ──▶ registry ──▶ record store
//!                                      │
//!                                      ▼
//!                               change notifier ──▶ durable marker ◀── other processes
//!                                      │
//!   client request                     ▼ (lazy)
//!   ──────────────▶ gate ─────────▶ route table ──▶ module router
//!                    │
//!                    └─ 404 for registered modules that are not installed
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use module_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use module_gateway::lifecycle::{bootstrap, spawn_signal_handler, Shutdown};
use module_gateway::observability::{logging, metrics};
use module_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "module-gateway", version, about = "Serve installable modules behind a request gate")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "MODULE_GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "module-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        reload_interval_secs = config.reload.check_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let registry = bootstrap(&config).await;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(shutdown.clone());

    let mut server = GatewayServer::new(config, registry);

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            server = server.with_config_updates(updates);
            match watcher.run() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    server.run(listener, shutdown).await?;
    Ok(())
}
