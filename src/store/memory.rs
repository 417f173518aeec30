//! In-process record store.

use dashmap::DashMap;
use std::sync::Arc;

use crate::store::{ModuleRecord, ModuleStatus, RecordStore, StoreResult};

/// A record store held entirely in memory.
///
/// Clones share the same map, so one instance can back several registries
/// in tests the way a database backs several server processes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, ModuleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, regardless of status.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, module_id: &str) -> StoreResult<Option<ModuleRecord>> {
        Ok(self.records.get(module_id).map(|r| r.value().clone()))
    }

    fn upsert(&self, record: ModuleRecord) -> StoreResult<()> {
        self.records.insert(record.module_id.clone(), record);
        Ok(())
    }

    fn filter(&self, status: ModuleStatus) -> StoreResult<Vec<ModuleRecord>> {
        let mut matched: Vec<ModuleRecord> = self
            .records
            .iter()
            .filter(|r| r.value().status == status)
            .map(|r| r.value().clone())
            .collect();
        matched.sort_by(|a, b| a.module_id.cmp(&b.module_id));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, status: ModuleStatus) -> ModuleRecord {
        ModuleRecord {
            module_id: id.into(),
            name: id.to_uppercase(),
            description: String::new(),
            version: "1.0.0".into(),
            status,
            installed_at: None,
            updated_at: None,
            base_path: String::new(),
        }
    }

    #[test]
    fn test_upsert_replaces_by_identifier() {
        let store = MemoryStore::new();
        store.upsert(record("blog", ModuleStatus::Installed)).unwrap();
        store.upsert(record("blog", ModuleStatus::NotInstalled)).unwrap();

        assert_eq!(store.len(), 1);
        let fetched = store.get("blog").unwrap().unwrap();
        assert_eq!(fetched.status, ModuleStatus::NotInstalled);
        assert!(store.get("shop").unwrap().is_none());
    }

    #[test]
    fn test_filter_is_sorted() {
        let store = MemoryStore::new();
        store.upsert(record("wiki", ModuleStatus::Installed)).unwrap();
        store.upsert(record("blog", ModuleStatus::Installed)).unwrap();
        store.upsert(record("shop", ModuleStatus::NotInstalled)).unwrap();

        let ids: Vec<_> = store
            .filter(ModuleStatus::Installed)
            .unwrap()
            .into_iter()
            .map(|r| r.module_id)
            .collect();
        assert_eq!(ids, vec!["blog", "wiki"]);
    }

    #[test]
    fn test_clones_share_records() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.upsert(record("blog", ModuleStatus::Installed)).unwrap();
        assert!(b.get("blog").unwrap().is_some());
    }
}
