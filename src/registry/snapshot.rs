//! Point-in-time view of the catalog and the active set.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::registry::{ModuleDescriptor, Mount};

/// An installed module as the router and gate see it.
#[derive(Debug, Clone)]
pub struct ActiveModule {
    pub descriptor: Arc<ModuleDescriptor>,
    pub mount: Mount,
}

impl ActiveModule {
    /// URL prefix this module answers under, `None` at the root.
    pub fn prefix(&self) -> Option<&str> {
        self.mount.prefix(self.descriptor.id())
    }
}

/// Immutable registry state. Swapped whole, so readers never observe a
/// half-applied mutation.
///
/// Invariant: every key of `active` is a key of `available`.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    available: BTreeMap<String, Arc<ModuleDescriptor>>,
    active: BTreeMap<String, ActiveModule>,
}

impl RegistrySnapshot {
    pub fn available(&self) -> &BTreeMap<String, Arc<ModuleDescriptor>> {
        &self.available
    }

    pub fn active(&self) -> &BTreeMap<String, ActiveModule> {
        &self.active
    }

    pub fn is_available(&self, module_id: &str) -> bool {
        self.available.contains_key(module_id)
    }

    pub fn is_active(&self, module_id: &str) -> bool {
        self.active.contains_key(module_id)
    }

    pub fn descriptor(&self, module_id: &str) -> Option<&Arc<ModuleDescriptor>> {
        self.available.get(module_id)
    }

    /// Identifier of the active module mounted under a custom `segment`.
    pub fn resolve_prefix(&self, segment: &str) -> Option<&str> {
        self.active
            .values()
            .find(|m| matches!(&m.mount, Mount::Prefix(p) if p == segment))
            .map(|m| m.descriptor.id())
    }

    /// Copy with `descriptor` registered. An active entry for the same
    /// identifier picks up the new descriptor.
    pub(crate) fn with_registered(&self, descriptor: Arc<ModuleDescriptor>) -> Self {
        let mut next = self.clone();
        if let Some(active) = next.active.get_mut(descriptor.id()) {
            active.descriptor = descriptor.clone();
        }
        next.available.insert(descriptor.id().to_string(), descriptor);
        next
    }

    /// Copy with `module_id` active at `mount`. No-op for unknown modules.
    pub(crate) fn with_active(&self, module_id: &str, mount: Mount) -> Self {
        let mut next = self.clone();
        if let Some(descriptor) = next.available.get(module_id) {
            let entry = ActiveModule {
                descriptor: descriptor.clone(),
                mount,
            };
            next.active.insert(module_id.to_string(), entry);
        }
        next
    }

    pub(crate) fn without_active(&self, module_id: &str) -> Self {
        let mut next = self.clone();
        next.active.remove(module_id);
        next
    }

    /// Copy with the active set replaced by `mounts`, dropping identifiers
    /// that are not registered.
    pub(crate) fn with_active_set(&self, mounts: &BTreeMap<String, Mount>) -> Self {
        let active = mounts
            .iter()
            .filter_map(|(id, mount)| {
                self.available.get(id).map(|descriptor| {
                    let entry = ActiveModule {
                        descriptor: descriptor.clone(),
                        mount: mount.clone(),
                    };
                    (id.clone(), entry)
                })
            })
            .collect();
        Self {
            available: self.available.clone(),
            active,
        }
    }
}
