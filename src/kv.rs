//! Durable key-value storage consumed by the entry store.
//!
//! The entry store only needs two operations, `get` and `set`, over string
//! values. `FileKeyValueStore` keeps one file per key on disk;
//! `MemoryKeyValueStore` keeps everything in process and can be told to
//! reject writes.

use std::{
    collections::HashMap,
    future::Future,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use log::{debug, error, trace};
use tempfile::NamedTempFile;

use crate::{MoodError, Result};

/// Abstraction over a durable string store.
///
/// Both methods return `Send` futures so stores can be driven from a
/// multi-threaded tokio runtime.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, `None` if nothing was ever written.
    fn get<'a>(&'a self, key: &'a str) -> impl Future<Output = Result<Option<String>>> + Send + 'a;

    /// Replaces the value stored under `key`.
    fn set<'a>(&'a self, key: &'a str, value: String) -> impl Future<Output = Result<()>> + Send + 'a;
}

fn persistence_error(key: &str, err: impl std::fmt::Display) -> MoodError {
    MoodError::Persistence {
        key: key.to_string(),
        message: err.to_string(),
    }
}

/// Whether `key` can name a stored value: non-empty, `[A-Za-z0-9_-]` only.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// File-backed store: `<dir>/<key>.json`, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(persistence_error(key, "key must be non-empty [A-Za-z0-9_-]"));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory so readers never observe a partial value.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl KeyValueStore for FileKeyValueStore {
    async fn get<'a>(&'a self, key: &'a str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        trace!("Reading key '{}' from {}", key, path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                debug!("Read {} bytes for key '{}'", contents.len(), key);
                Ok(Some(contents))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No value stored for key '{}'", key);
                Ok(None)
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                Err(persistence_error(key, e))
            }
        }
    }

    async fn set<'a>(&'a self, key: &'a str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        trace!("Writing {} bytes for key '{}'", value.len(), key);

        let target = path.clone();
        let outcome = tokio::task::spawn_blocking(move || write_atomic(&target, value.as_bytes()))
            .await
            .map_err(|e| persistence_error(key, e))?;

        outcome.map_err(|e| {
            error!("Failed to write {}: {}", path.display(), e);
            persistence_error(key, e)
        })?;

        debug!("Persisted key '{}' to {}", key, path.display());
        Ok(())
    }
}

/// In-process store. Values live only as long as the store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled every `set` fails with a persistence error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stores a raw value without going through the async interface.
    pub fn insert_raw(&self, key: &str, value: impl Into<String>) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Reads a raw value without going through the async interface.
    pub fn raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| MoodError::LockAcquisitionFailed {
                message: "Failed to acquire lock on in-memory key-value store".to_string(),
            })
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    async fn get<'a>(&'a self, key: &'a str) -> Result<Option<String>> {
        self.raw(key)
    }

    async fn set<'a>(&'a self, key: &'a str, value: String) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(persistence_error(key, "write rejected"));
        }
        self.insert_raw(key, value)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn file_store_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        assert_eq!(store.get("entries").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested"));

        store.set("entries", "[1,2]".to_string()).await.unwrap();
        store.set("entries", "[3]".to_string()).await.unwrap();

        assert_eq!(store.get("entries").await.unwrap().as_deref(), Some("[3]"));
        assert!(dir.path().join("nested").join("entries.json").exists());
    }

    #[tokio::test]
    async fn file_store_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", String::new()).await,
            Err(MoodError::Persistence { .. })
        ));
        assert!(store.get("").await.is_err());
    }

    #[tokio::test]
    async fn memory_store_can_reject_writes() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "v".to_string()).await.unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            store.set("k", "w".to_string()).await,
            Err(MoodError::Persistence { ref key, .. }) if key == "k"
        ));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
