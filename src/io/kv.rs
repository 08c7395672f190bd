//! String-keyed blob storage.
//!
//! The quest store only needs `get` and `set` of whole blobs. `FileStore`
//! keeps one `<key>.json` file per key inside the store directory and is what
//! the CLI uses; `MemoryStore` backs tests and embedders that persist
//! elsewhere.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::lock::{FileLock, LockError};
use crate::io::recovery::atomic_write;

/// Error type for key-value operations
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("invalid key '{0}': use letters, digits, '-' or '_'")]
    InvalidKey(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A local key-value facility holding serialized blobs.
pub trait KeyValueStore {
    /// The blob stored under `key`, or `None` if the key was never set.
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Replace the blob under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;

    /// Serialize writers across processes. Stores that are private to one
    /// process need no lock.
    fn lock(&self, _timeout: Duration) -> Result<Option<FileLock>, LockError> {
        Ok(None)
    }

    /// Directory for the recovery log, if this store has one.
    fn recovery_dir(&self) -> Option<&Path> {
        None
    }
}

fn validate_key(key: &str) -> Result<(), KvError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidKey(key.to_string()))
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// One JSON file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    /// Path of the file backing `key`
    pub fn key_path(&self, key: &str) -> Result<PathBuf, KvError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::Io { path, source: e }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.key_path(key)?;
        atomic_write(&path, value.as_bytes()).map_err(|e| KvError::Io { path, source: e })
    }

    fn lock(&self, timeout: Duration) -> Result<Option<FileLock>, LockError> {
        FileLock::acquire(&self.dir, timeout).map(Some)
    }

    fn recovery_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        assert!(store.get("quests").unwrap().is_none());
    }

    #[test]
    fn test_file_store_set_then_get() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        store.set("quests", "{}").unwrap();
        assert_eq!(store.get("quests").unwrap().as_deref(), Some("{}"));
        assert!(tmp.path().join("quests.json").exists());

        store.set("quests", r#"{"a":1}"#).unwrap();
        assert_eq!(store.get("quests").unwrap().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(KvError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.get("archive").unwrap().is_none());
        store.set("archive", "{}").unwrap();
        assert_eq!(store.get("archive").unwrap().as_deref(), Some("{}"));
        assert!(store.lock(Duration::from_millis(1)).unwrap().is_none());
        assert!(store.recovery_dir().is_none());
    }

    #[test]
    fn test_file_store_lock_is_exclusive() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        let held = store.lock(Duration::from_millis(50)).unwrap();
        assert!(held.is_some());
        assert!(store.lock(Duration::from_millis(50)).is_err());
    }
}
