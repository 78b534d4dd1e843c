//! Durable key-value backends for the credential slots.
//!
//! The credential store only needs a handful of string slots, so every
//! backend speaks the same small contract: read one key, write a batch,
//! remove a batch. A missing key is `Ok(None)`, never an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage read failed for '{key}': {message}")]
    Read { key: String, message: String },

    #[error("Storage write failed: {0}")]
    Write(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Async key-value capability backing the credential store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write every pair in one call. Backends that can do so apply the batch
    /// atomically.
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove every key in one call. Keys that are already absent are skipped.
    async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_many(&[(key, value)]).await
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local store. Batches apply under a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().await;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().await;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// Credential file name inside the storage directory
const STORE_FILE: &str = "credentials.json";

/// Owner read/write only: the file holds bearer and refresh tokens
#[cfg(unix)]
const CREDENTIAL_FILE_MODE: u32 = 0o600;

/// Stores all slots in a single JSON object on disk.
///
/// Every write rewrites the whole file through a temp file and a rename, so a
/// reader sees either the old batch or the new one.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, map: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(CREDENTIAL_FILE_MODE);
        let mut file = options.open(&tmp).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        // A temp file left behind by an earlier crash keeps its old mode
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(CREDENTIAL_FILE_MODE))
                .await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), keys = map.len(), "Credential file written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        let map = self.read_all().await.map_err(|e| StorageError::Read {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(map.get(key).cloned())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all().await?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        self.write_all(&map).await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut map = match self.read_all().await {
            Ok(map) => map,
            // An unreadable file is replaced rather than blocking logout.
            Err(StorageError::Corrupt(_)) => HashMap::new(),
            Err(e) => return Err(e),
        };
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before && before > 0 {
            return Ok(());
        }
        if map.is_empty() {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        } else {
            self.write_all(&map).await
        }
    }
}
