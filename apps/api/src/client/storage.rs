//! Key/value persistence for the client cache, shaped like browser local
//! storage: string values, and allowed to refuse writes.
//!
//! File I/O runs on the blocking pool via `spawn_blocking`, so a slow disk
//! only suspends the task that asked.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use directories::ProjectDirs;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded ({needed} bytes needed, {quota} allowed)")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

async fn run_blocking<T, F>(op: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StorageError::Unavailable(format!("storage task failed: {e}")))?
}

fn check_quota(quota: Option<usize>, value: &str) -> Result<(), StorageError> {
    match quota {
        Some(quota) if value.len() > quota => Err(StorageError::QuotaExceeded {
            needed: value.len(),
            quota,
        }),
        _ => Ok(()),
    }
}

/// One JSON file per key in a directory. Writes go through a temp file
/// that is persisted over the target.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStorage {
    /// Uses the platform cache directory (`~/.cache/review-client/` on Linux).
    /// Returns `None` when no home directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "review-client")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir, quota: None }
    }

    /// Caps the size of any single value, in bytes.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        run_blocking(move || match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        let dir = self.dir.clone();
        let path = self.path(key);
        let value = value.to_string();

        run_blocking(move || {
            fs::create_dir_all(&dir)?;
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        run_blocking(move || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
    }
}

/// Process-local storage. Used when nothing should touch disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.items
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items()?.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota, value)?;
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::with_dir(dir.path().join("nested"));

        assert_eq!(storage.get_item("k").await.unwrap(), None);
        storage.set_item("k", "{\"a\":1}").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("nested").join("k.json").exists());

        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
        storage.remove_item("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_overwrite_leaves_single_file() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::with_dir(dir.path().to_path_buf());

        storage.set_item("k", "first").await.unwrap();
        storage.set_item("k", "second").await.unwrap();

        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("second"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_quota_rejects_large_values() {
        let storage = MemoryStorage::with_quota(4);
        assert!(storage.set_item("k", "tiny").await.is_ok());
        let err = storage.set_item("k", "too large").await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { needed: 9, quota: 4 }));
        // The earlier value survives a rejected write.
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("tiny"));
    }

    #[tokio::test]
    async fn test_file_storage_quota() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::with_dir(dir.path().to_path_buf()).with_quota(1);
        assert!(matches!(
            storage.set_item("k", "xx").await,
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }

    #[test]
    fn test_new_uses_project_cache_dir() {
        if let Some(storage) = FileStorage::new() {
            assert!(storage.dir.to_string_lossy().contains("review-client"));
        }
    }
}
