//! Durable locations for the route change stamp.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::store::file_lock::{replace_file, with_exclusive_lock};

/// Errors reading or writing a change marker.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("marker holds unparsable value '{0}'")]
    Parse(String),
}

/// A multi-reader location holding a single timestamp.
pub trait MarkerStore: Send + Sync {
    /// The stored stamp, `None` if nothing was written yet.
    fn read(&self) -> Result<Option<f64>, MarkerError>;

    /// Replace the stored stamp.
    fn write(&self, stamp: f64) -> Result<(), MarkerError>;

    /// Replace the stored stamp with `next(current)` as one step no other
    /// writer can interleave with. Returns the stamp stored.
    fn update(&self, next: &mut dyn FnMut(Option<f64>) -> f64) -> Result<f64, MarkerError>;
}

/// Marker kept in a plain text file shared by every server process.
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_unlocked(&self) -> Result<Option<f64>, MarkerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MarkerError::Io(e)),
        };
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<f64>()
            .map(Some)
            .map_err(|_| MarkerError::Parse(trimmed.to_string()))
    }

    fn write_unlocked(&self, stamp: f64) -> Result<(), MarkerError> {
        replace_file(&self.path, |file| write!(file, "{}", stamp))?;
        Ok(())
    }
}

impl MarkerStore for FileMarker {
    fn read(&self) -> Result<Option<f64>, MarkerError> {
        self.read_unlocked()
    }

    fn write(&self, stamp: f64) -> Result<(), MarkerError> {
        with_exclusive_lock(&self.path, || self.write_unlocked(stamp))
    }

    fn update(&self, next: &mut dyn FnMut(Option<f64>) -> f64) -> Result<f64, MarkerError> {
        with_exclusive_lock(&self.path, || {
            // A garbled marker is overwritten rather than blocking every change.
            let current = match self.read_unlocked() {
                Ok(current) => current,
                Err(MarkerError::Parse(_)) => None,
                Err(e) => return Err(e),
            };
            let stamp = next(current);
            self.write_unlocked(stamp)?;
            Ok(stamp)
        })
    }
}

/// Marker kept in memory. Clones share the value.
#[derive(Debug, Clone)]
pub struct MemoryMarker {
    /// f64 bits; `u64::MAX` means "never written".
    bits: Arc<AtomicU64>,
}

impl MemoryMarker {
    pub fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(u64::MAX)),
        }
    }
}

impl Default for MemoryMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerStore for MemoryMarker {
    fn read(&self) -> Result<Option<f64>, MarkerError> {
        match self.bits.load(Ordering::Acquire) {
            u64::MAX => Ok(None),
            bits => Ok(Some(f64::from_bits(bits))),
        }
    }

    fn write(&self, stamp: f64) -> Result<(), MarkerError> {
        self.bits.store(stamp.to_bits(), Ordering::Release);
        Ok(())
    }

    fn update(&self, next: &mut dyn FnMut(Option<f64>) -> f64) -> Result<f64, MarkerError> {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let previous = (current != u64::MAX).then(|| f64::from_bits(current));
            let stamp = next(previous);
            match self.bits.compare_exchange(
                current,
                stamp.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(stamp),
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_marker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let marker = FileMarker::new(dir.path().join(".routes_timestamp"));

        assert!(marker.read().unwrap().is_none());
        marker.write(1_700_000_000.25).unwrap();
        assert_eq!(marker.read().unwrap(), Some(1_700_000_000.25));
    }

    #[test]
    fn test_file_marker_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".routes_timestamp");
        std::fs::write(&path, "yesterday").unwrap();

        let marker = FileMarker::new(&path);
        assert!(matches!(marker.read(), Err(MarkerError::Parse(_))));
    }

    #[test]
    fn test_file_marker_updates_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".routes_timestamp");

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let marker = FileMarker::new(&path);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        marker
                            .update(&mut |current| current.unwrap_or(0.0) + 1.0)
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(FileMarker::new(&path).read().unwrap(), Some(200.0));
    }

    #[test]
    fn test_memory_marker_starts_empty() {
        let marker = MemoryMarker::new();
        assert!(marker.read().unwrap().is_none());
        marker.write(0.0).unwrap();
        assert_eq!(marker.read().unwrap(), Some(0.0));
    }
}
