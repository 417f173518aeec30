//! Record store persisted as a single JSON document.
//!
//! Every read goes back to disk so that separate server processes pointed at
//! the same file observe each other's writes. Upserts hold the file's lock
//! from load to rename, and each write goes through its own temporary file,
//! so concurrent writers neither lose records nor corrupt the document.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::store::file_lock::{replace_file, with_exclusive_lock};
use crate::store::{ModuleRecord, ModuleStatus, RecordStore, StoreError, StoreResult};

type RecordMap = BTreeMap<String, ModuleRecord>;

/// File-backed record store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Point a store at `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<RecordMap> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordMap::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    fn save(&self, records: &RecordMap) -> StoreResult<()> {
        let content = serde_json::to_vec_pretty(records)?;
        replace_file(&self.path, |file| {
            let mut writer = BufWriter::new(file);
            writer.write_all(&content)?;
            writer.flush()
        })?;
        tracing::debug!(path = ?self.path, records = records.len(), "Saved module records");
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self, module_id: &str) -> StoreResult<Option<ModuleRecord>> {
        Ok(self.load()?.remove(module_id))
    }

    fn upsert(&self, record: ModuleRecord) -> StoreResult<()> {
        with_exclusive_lock(&self.path, || {
            let mut records = self.load()?;
            records.insert(record.module_id.clone(), record);
            self.save(&records)
        })
    }

    fn filter(&self, status: ModuleStatus) -> StoreResult<Vec<ModuleRecord>> {
        Ok(self
            .load()?
            .into_values()
            .filter(|r| r.status == status)
            .collect())
    }
}
