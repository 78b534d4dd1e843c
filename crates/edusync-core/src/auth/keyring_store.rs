use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::storage::{KeyValueStore, StorageError};

/// Keychain service name used for all EduSync entries
pub const SERVICE_NAME: &str = "edusync";

/// OS keychain backend: one keychain entry per slot.
///
/// The keychain has no batch primitive, so `set_many` and `remove_many` write
/// entries one after another. A reader racing a login can briefly observe a
/// partially written batch.
///
/// Keychain calls are synchronous, so each operation runs on tokio's
/// blocking pool.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

fn entry(service: &str, key: &str) -> Result<Entry, keyring::Error> {
    Entry::new(service, key)
}

fn read_entry(service: &str, key: &str) -> Result<Option<String>, StorageError> {
    let read_error = |e: keyring::Error| StorageError::Read {
        key: key.to_string(),
        message: e.to_string(),
    };
    match entry(service, key).map_err(read_error)?.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(read_error(e)),
    }
}

fn write_entries(service: &str, entries: &[(String, String)]) -> Result<(), StorageError> {
    for (key, value) in entries {
        entry(service, key)
            .and_then(|e| e.set_password(value))
            .map_err(|e| StorageError::Write(format!("Failed to store '{}' in keychain: {}", key, e)))?;
    }
    Ok(())
}

fn delete_entries(service: &str, keys: &[String]) -> Result<(), StorageError> {
    for key in keys {
        match entry(service, key).and_then(|e| e.delete_credential()) {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => {
                return Err(StorageError::Write(format!(
                    "Failed to delete '{}' from keychain: {}",
                    key, e
                )))
            }
        }
    }
    Ok(())
}

fn join_error(e: tokio::task::JoinError) -> StorageError {
    StorageError::Write(format!("Keychain task failed: {}", e))
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let service = self.service.clone();
        let owned_key = key.to_string();
        tokio::task::spawn_blocking(move || read_entry(&service, &owned_key))
            .await
            .map_err(|e| StorageError::Read {
                key: key.to_string(),
                message: e.to_string(),
            })?
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let service = self.service.clone();
        let owned: Vec<(String, String)> = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        tokio::task::spawn_blocking(move || write_entries(&service, &owned))
            .await
            .map_err(join_error)??;
        debug!(count = entries.len(), "Keychain entries stored");
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let service = self.service.clone();
        let owned: Vec<String> = keys.iter().map(|k| (*k).to_string()).collect();
        tokio::task::spawn_blocking(move || delete_entries(&service, &owned))
            .await
            .map_err(join_error)?
    }
}
