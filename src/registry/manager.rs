//! Install/uninstall/upgrade state machine.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notifier::ChangeNotifier;
use crate::observability::metrics;
use crate::registry::{
    ModuleDescriptor, Mount, RegistryError, RegistryResult, RegistrySnapshot,
};
use crate::store::{now_millis, ModuleRecord, ModuleStatus, RecordStore, StoreResult};

/// Merged catalog + persisted state of one module, as listed to admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleView {
    pub module_id: String,
    pub name: String,
    pub description: String,
    /// Version declared by the linked code.
    pub version: String,
    pub component: String,
    pub status: ModuleStatus,
    /// Version recorded at the last install or upgrade.
    pub installed_version: Option<String>,
    pub installed_at: Option<u64>,
    pub updated_at: Option<u64>,
    pub base_path: String,
    pub active: bool,
    pub has_routes: bool,
}

/// Catalog of linked modules joined with their persisted state.
///
/// One instance per process, constructed explicitly and shared by `Arc`.
pub struct ModuleRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
    /// Held exclusively while a record write and its snapshot swap happen,
    /// shared while a reader joins records with the snapshot.
    txn: RwLock<()>,
    store: Arc<dyn RecordStore>,
    notifier: Arc<ChangeNotifier>,
    closed: AtomicBool,
}

impl ModuleRegistry {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            txn: RwLock::new(()),
            store,
            notifier,
            closed: AtomicBool::new(false),
        }
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Current catalog and active set.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Modules whose persisted status is installed.
    pub fn active_modules(&self) -> Arc<RegistrySnapshot> {
        self.snapshot()
    }

    /// Add `descriptor` to the catalog. Re-registering an identifier
    /// replaces the previous descriptor.
    pub fn register(&self, descriptor: ModuleDescriptor) {
        let descriptor = Arc::new(descriptor);
        tracing::debug!(
            module_id = %descriptor.id(),
            version = %descriptor.version(),
            "Registering module"
        );
        self.snapshot
            .rcu(|current| current.with_registered(descriptor.clone()));
        self.notifier.force_reload();
    }

    /// Rebuild the active set from persisted records.
    ///
    /// Installed records for modules missing from this binary are flipped
    /// to not-installed. Installed records whose version lags the linked
    /// code are marked upgrade-available and stay active. An unreachable
    /// store is treated as "nothing installed". Returns the active count.
    pub async fn synchronize(&self) -> usize {
        let _txn = self.txn.write().await;
        let records = match self.installed_records() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Record store unavailable, treating as no modules installed");
                Vec::new()
            }
        };

        let snapshot = self.snapshot.load_full();
        let mut mounts = BTreeMap::new();
        for mut record in records {
            let Some(descriptor) = snapshot.descriptor(&record.module_id) else {
                tracing::warn!(
                    module_id = %record.module_id,
                    "Installed module is not linked into this build, marking not installed"
                );
                record.status = ModuleStatus::NotInstalled;
                self.persist_best_effort(record);
                continue;
            };

            mounts.insert(record.module_id.clone(), Mount::from_stored(&record.base_path));
            if record.status == ModuleStatus::Installed && record.version != descriptor.version() {
                tracing::info!(
                    module_id = %record.module_id,
                    installed = %record.version,
                    available = %descriptor.version(),
                    "Upgrade available"
                );
                record.status = ModuleStatus::UpgradeAvailable;
                self.persist_best_effort(record);
            }
        }

        self.snapshot.rcu(|current| current.with_active_set(&mounts));
        let active = self.snapshot.load().active().len();
        metrics::record_active_modules(active);
        self.notifier.invalidate();
        tracing::info!(active, "Module registry synchronized");
        active
    }

    /// Install a registered module, optionally at a custom base path.
    pub async fn install(&self, module_id: &str, base_path: Option<&str>) -> RegistryResult<()> {
        let result = self.install_inner(module_id, base_path).await;
        self.log_outcome("install", module_id, &result);
        result
    }

    async fn install_inner(&self, module_id: &str, base_path: Option<&str>) -> RegistryResult<()> {
        self.ensure_open()?;
        let descriptor = self.require_registered(module_id)?;
        let requested_mount = base_path.map(Mount::parse).transpose()?;

        // No lock is held while the hook runs.
        descriptor
            .run_setup()
            .await
            .map_err(|reason| RegistryError::SetupFailed {
                module_id: module_id.to_string(),
                reason,
            })?;

        let path_changed = {
            let _txn = self.txn.write().await;
            let descriptor = self.require_registered(module_id)?;
            let now = now_millis();

            let existing = self.store.get(module_id)?;
            let previous_path = existing
                .as_ref()
                .map(|r| r.base_path.clone())
                .unwrap_or_default();

            let mut record = match existing {
                Some(mut record) => {
                    record.updated_at = Some(now);
                    record
                }
                None => ModuleRecord {
                    module_id: module_id.to_string(),
                    name: String::new(),
                    description: String::new(),
                    version: String::new(),
                    status: ModuleStatus::NotInstalled,
                    installed_at: Some(now),
                    updated_at: None,
                    base_path: String::new(),
                },
            };
            record.name = descriptor.name().to_string();
            record.description = descriptor.description().to_string();
            record.version = descriptor.version().to_string();
            record.status = ModuleStatus::Installed;
            if let Some(mount) = &requested_mount {
                record.base_path = mount.to_stored();
            }

            let mount = Mount::from_stored(&record.base_path);
            let path_changed = record.base_path != previous_path;
            self.store.upsert(record)?;
            self.snapshot
                .rcu(|current| current.with_active(module_id, mount.clone()));
            path_changed
        };

        self.notifier.force_reload();
        if path_changed {
            self.notifier.path_changed(module_id);
        }
        Ok(())
    }

    /// Mark an installed module not-installed. Its record, base path and
    /// install timestamp are kept for a later reinstall.
    pub async fn uninstall(&self, module_id: &str) -> RegistryResult<()> {
        let result = self.uninstall_inner(module_id).await;
        self.log_outcome("uninstall", module_id, &result);
        result
    }

    async fn uninstall_inner(&self, module_id: &str) -> RegistryResult<()> {
        self.ensure_open()?;
        self.require_registered(module_id)?;
        {
            let _txn = self.txn.write().await;
            self.require_active(module_id)?;

            let mut record = self.require_record(module_id)?;
            record.status = ModuleStatus::NotInstalled;
            self.store.upsert(record)?;
            self.snapshot.rcu(|current| current.without_active(module_id));
        }
        self.notifier.force_reload();
        Ok(())
    }

    /// Bring the persisted version up to the linked code's version.
    ///
    /// The setup hook is not run; only the record catches up with the
    /// linked code.
    pub async fn upgrade(&self, module_id: &str) -> RegistryResult<()> {
        let result = self.upgrade_inner(module_id).await;
        self.log_outcome("upgrade", module_id, &result);
        result
    }

    async fn upgrade_inner(&self, module_id: &str) -> RegistryResult<()> {
        self.ensure_open()?;
        {
            let _txn = self.txn.write().await;
            let descriptor = self.require_registered(module_id)?;
            self.require_active(module_id)?;

            let mut record = self.require_record(module_id)?;
            record.version = descriptor.version().to_string();
            record.updated_at = Some(now_millis());
            record.status = ModuleStatus::Installed;
            let mount = Mount::from_stored(&record.base_path);
            self.store.upsert(record)?;
            self.snapshot
                .rcu(|current| current.with_active(module_id, mount.clone()));
        }
        self.notifier.force_reload();
        Ok(())
    }

    /// Move a module to a new base path. Works whether or not the module is
    /// currently installed, as long as it has a record.
    pub async fn update_path(&self, module_id: &str, base_path: &str) -> RegistryResult<()> {
        let result = self.update_path_inner(module_id, base_path).await;
        self.log_outcome("update_path", module_id, &result);
        result
    }

    async fn update_path_inner(&self, module_id: &str, base_path: &str) -> RegistryResult<()> {
        self.ensure_open()?;
        self.require_registered(module_id)?;
        let mount = Mount::parse(base_path)?;
        {
            let _txn = self.txn.write().await;
            let mut record = self.require_record(module_id)?;
            record.base_path = mount.to_stored();
            self.store.upsert(record)?;
            if self.snapshot.load().is_active(module_id) {
                self.snapshot
                    .rcu(|current| current.with_active(module_id, mount.clone()));
            }
        }
        self.notifier.path_changed(module_id);
        Ok(())
    }

    /// True when the module is registered and its record's version differs
    /// from the linked code's version.
    pub async fn check_upgrade_available(&self, module_id: &str) -> bool {
        let _txn = self.txn.read().await;
        let Some(descriptor) = self.snapshot.load().descriptor(module_id).cloned() else {
            return false;
        };
        match self.store.get(module_id) {
            Ok(Some(record)) => record.version != descriptor.version(),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(module_id = %module_id, error = %e, "Upgrade check failed");
                false
            }
        }
    }

    /// Every registered module with its persisted state.
    ///
    /// Installed records whose version lags the linked code are reported
    /// and persisted as upgrade-available.
    pub async fn list_all(&self) -> RegistryResult<Vec<ModuleView>> {
        let mut stale = Vec::new();
        let views = {
            let _txn = self.txn.read().await;
            let snapshot = self.snapshot.load();
            let mut views = Vec::with_capacity(snapshot.available().len());

            for (module_id, descriptor) in snapshot.available() {
                let record = self.store.get(module_id)?;
                let mut status = record
                    .as_ref()
                    .map(|r| r.status)
                    .unwrap_or(ModuleStatus::NotInstalled);
                if let Some(r) = &record {
                    if status == ModuleStatus::Installed && r.version != descriptor.version() {
                        status = ModuleStatus::UpgradeAvailable;
                        stale.push(module_id.clone());
                    }
                }

                views.push(ModuleView {
                    module_id: module_id.clone(),
                    name: descriptor.name().to_string(),
                    description: descriptor.description().to_string(),
                    version: descriptor.version().to_string(),
                    component: descriptor.component().to_string(),
                    status,
                    installed_version: record.as_ref().map(|r| r.version.clone()),
                    installed_at: record.as_ref().and_then(|r| r.installed_at),
                    updated_at: record.as_ref().and_then(|r| r.updated_at),
                    base_path: record.map(|r| r.base_path).unwrap_or_default(),
                    active: snapshot.is_active(module_id),
                    has_routes: descriptor.routes().is_some(),
                });
            }
            views
        };

        if !stale.is_empty() {
            self.mark_upgrades_available(&stale).await;
        }
        Ok(views)
    }

    /// Refuse further mutations. Reads keep working.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!("Module registry shut down");
        }
    }

    async fn mark_upgrades_available(&self, module_ids: &[String]) {
        let _txn = self.txn.write().await;
        let snapshot = self.snapshot.load();
        for module_id in module_ids {
            let Some(descriptor) = snapshot.descriptor(module_id) else {
                continue;
            };
            match self.store.get(module_id) {
                Ok(Some(mut record))
                    if record.status == ModuleStatus::Installed
                        && record.version != descriptor.version() =>
                {
                    record.status = ModuleStatus::UpgradeAvailable;
                    self.persist_best_effort(record);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(module_id = %module_id, error = %e, "Failed to flag upgrade");
                }
            }
        }
    }

    fn installed_records(&self) -> StoreResult<Vec<ModuleRecord>> {
        let mut records = self.store.filter(ModuleStatus::Installed)?;
        records.extend(self.store.filter(ModuleStatus::UpgradeAvailable)?);
        Ok(records)
    }

    fn persist_best_effort(&self, record: ModuleRecord) {
        let module_id = record.module_id.clone();
        if let Err(e) = self.store.upsert(record) {
            tracing::error!(module_id = %module_id, error = %e, "Failed to persist module status");
        }
    }

    fn ensure_open(&self) -> RegistryResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::ShutDown);
        }
        Ok(())
    }

    fn require_registered(&self, module_id: &str) -> RegistryResult<Arc<ModuleDescriptor>> {
        self.snapshot
            .load()
            .descriptor(module_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered(module_id.to_string()))
    }

    fn require_active(&self, module_id: &str) -> RegistryResult<()> {
        if self.snapshot.load().is_active(module_id) {
            Ok(())
        } else {
            Err(RegistryError::NotActive(module_id.to_string()))
        }
    }

    fn require_record(&self, module_id: &str) -> RegistryResult<ModuleRecord> {
        self.store
            .get(module_id)?
            .ok_or_else(|| RegistryError::RecordMissing(module_id.to_string()))
    }

    fn log_outcome(&self, operation: &'static str, module_id: &str, result: &RegistryResult<()>) {
        metrics::record_module_operation(operation, result.is_ok());
        match result {
            Ok(()) => {
                metrics::record_active_modules(self.snapshot.load().active().len());
                tracing::info!(module_id = %module_id, operation, "Module operation succeeded");
            }
            Err(e) => tracing::error!(module_id = %module_id, operation, error = %e, "Module operation failed"),
        }
    }
}
