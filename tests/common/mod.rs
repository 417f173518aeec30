//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use module_gateway::config::{GatewayConfig, StoreKind};
use module_gateway::lifecycle::{bootstrap, Shutdown};
use module_gateway::{GatewayServer, ModuleRegistry};

pub const API_KEY: &str = "integration-key";

/// A gateway running on an ephemeral local port.
pub struct TestGateway {
    pub addr: SocketAddr,
    #[allow(dead_code)]
    pub registry: Arc<ModuleRegistry>,
    pub shutdown: Arc<Shutdown>,
    client: reqwest::Client,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn admin(&self, method: reqwest::Method, path: &str, body: Option<serde_json::Value>) -> reqwest::Response {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(API_KEY);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    /// Poll `path` until it answers `status` or `timeout` passes.
    #[allow(dead_code)]
    pub async fn wait_for_status(&self, path: &str, status: u16, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.get(path).await.status().as_u16() == status {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with an in-memory store, for single-process tests.
pub fn memory_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.store.kind = StoreKind::Memory;
    config.admin.api_key = API_KEY.into();
    config
}

/// Config backed by files under `dir`, shareable between processes.
#[allow(dead_code)]
pub fn shared_config(dir: &Path) -> GatewayConfig {
    let mut config = memory_config();
    config.store.kind = StoreKind::JsonFile;
    config.store.path = dir.join("modules.json").display().to_string();
    config.reload.marker_path = dir.join(".module_routes_timestamp").display().to_string();
    config.reload.check_interval_secs = 1;
    config
}

/// Bootstrap and serve a gateway with the built-in catalog.
pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    let registry = bootstrap(&config).await;
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let server = GatewayServer::new(config, registry.clone());
    tokio::spawn(server.run(listener, shutdown.clone()));

    TestGateway {
        addr,
        registry,
        shutdown,
        client: reqwest::Client::new(),
    }
}
