//! File access shared by several processes.
//!
//! Writers take an advisory lock on a sibling `<file>.lock` for the whole
//! read-modify-write cycle. Contents are replaced by writing a uniquely
//! named temporary file in the same directory and renaming it over the
//! target, so readers see either the old or the new document.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Path of the lock file guarding `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Run `f` while holding the exclusive lock for `path`.
///
/// The lock is per open file, so it also excludes other handles in the same
/// process.
pub fn with_exclusive_lock<T, E, F>(path: &Path, f: F) -> Result<T, E>
where
    E: From<io::Error>,
    F: FnOnce() -> Result<T, E>,
{
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path(path))?;
    let mut lock = fd_lock::RwLock::new(file);
    let _guard = lock.write()?;
    f()
}

/// Atomically replace the contents of `path` with what `write` produces.
pub fn replace_file<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_is_a_sibling() {
        assert_eq!(
            lock_path(Path::new("/var/lib/gateway/modules.json")),
            PathBuf::from("/var/lib/gateway/modules.json.lock")
        );
        assert_eq!(lock_path(Path::new("marker")), PathBuf::from("marker.lock"));
    }

    #[test]
    fn test_replace_file_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        replace_file(&path, |w| w.write_all(b"one")).unwrap();
        replace_file(&path, |w| w.write_all(b"two")).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_keeps_old_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        replace_file(&path, |w| w.write_all(b"kept")).unwrap();

        let result = replace_file(&path, |_| Err(io::Error::other("encoder failed")));
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kept");
    }

    #[test]
    fn test_lock_serializes_handles() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("data.txt"));
        let inside = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                let inside = inside.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        with_exclusive_lock(&path, || -> io::Result<()> {
                            assert!(!inside.swap(true, Ordering::SeqCst));
                            std::thread::yield_now();
                            inside.store(false, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
