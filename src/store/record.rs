//! Persisted per-module state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Installation status of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    #[default]
    NotInstalled,
    Installed,
    UpgradeAvailable,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::NotInstalled => "not_installed",
            ModuleStatus::Installed => "installed",
            ModuleStatus::UpgradeAvailable => "upgrade_available",
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted module record.
///
/// `base_path` is stored raw: empty means "mount under the identifier",
/// `"/"` mounts at the application root, anything else is a custom prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModuleRecord {
    pub module_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub status: ModuleStatus,
    /// Unix millis of the first successful install. Never rewritten.
    #[serde(default)]
    pub installed_at: Option<u64>,
    /// Unix millis of the latest reinstall or upgrade.
    #[serde(default)]
    pub updated_at: Option<u64>,
    #[serde(default)]
    pub base_path: String,
}

impl fmt::Display for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.module_id, self.status)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
