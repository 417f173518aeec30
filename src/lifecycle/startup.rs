//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the record store and change marker named by the configuration
//! - Construct the change notifier and module registry
//! - Register the linked modules, then reconcile with persisted state
//!
//! # Design Decisions
//! - Subsystems initialize in order, not concurrently
//! - An unreachable store is not fatal: the process starts with no
//!   installed modules
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use crate::catalog::builtin_catalog;
use crate::config::{GatewayConfig, StoreKind};
use crate::notifier::{ChangeNotifier, FileMarker, MarkerStore, MemoryMarker};
use crate::registry::{ModuleDescriptor, ModuleRegistry};
use crate::store::{JsonFileStore, MemoryStore, RecordStore};

/// Build a synchronized registry over the built-in catalog.
pub async fn bootstrap(config: &GatewayConfig) -> Arc<ModuleRegistry> {
    bootstrap_with(config, builtin_catalog()).await
}

/// Build a synchronized registry over `catalog`.
pub async fn bootstrap_with(
    config: &GatewayConfig,
    catalog: Vec<ModuleDescriptor>,
) -> Arc<ModuleRegistry> {
    let (store, marker): (Arc<dyn RecordStore>, Arc<dyn MarkerStore>) = match config.store.kind {
        StoreKind::Memory => (Arc::new(MemoryStore::new()), Arc::new(MemoryMarker::new())),
        StoreKind::JsonFile => (
            Arc::new(JsonFileStore::new(&config.store.path)),
            Arc::new(FileMarker::new(&config.reload.marker_path)),
        ),
    };
    tracing::info!(
        store = ?config.store.kind,
        store_path = %config.store.path,
        marker_path = %config.reload.marker_path,
        "Record store selected"
    );

    let notifier = Arc::new(ChangeNotifier::new(marker));
    let registry = Arc::new(ModuleRegistry::new(store, notifier));
    for descriptor in catalog {
        registry.register(descriptor);
    }

    let active = registry.synchronize().await;
    tracing::info!(
        available = registry.snapshot().available().len(),
        active,
        "Module registry ready"
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_memory_store() {
        let mut config = GatewayConfig::default();
        config.store.kind = StoreKind::Memory;

        let registry = bootstrap(&config).await;
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.available().len(), 3);
        assert!(snapshot.active().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_restores_installed_modules() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GatewayConfig::default();
        config.store.path = dir.path().join("modules.json").display().to_string();
        config.reload.marker_path = dir.path().join(".marker").display().to_string();

        let first = bootstrap(&config).await;
        first.install("wiki", Some("docs")).await.unwrap();
        first.shutdown();

        let second = bootstrap(&config).await;
        assert!(second.snapshot().is_active("wiki"));
        assert_eq!(second.snapshot().resolve_prefix("docs"), Some("wiki"));
    }
}
