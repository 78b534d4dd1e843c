//! Shared helpers for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::ApiClient;
use crate::auth::{CredentialStore, Credentials, KeyValueStore, MemoryStore, StorageError};
use crate::models::User;

/// In-memory backend whose reads and writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.is_empty().await
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Read {
                key: key.to_string(),
                message: "simulated read failure".to_string(),
            });
        }
        self.inner.get(key).await
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("simulated write failure".to_string()));
        }
        self.inner.set_many(entries).await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("simulated write failure".to_string()));
        }
        self.inner.remove_many(keys).await
    }
}

pub fn sample_user() -> User {
    User::new("Ada Lovelace", "ada@example.com")
}

pub fn sample_credentials(access: &str, refresh: &str) -> Credentials {
    Credentials {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        user: sample_user(),
    }
}

/// API client against a mock server with an in-memory credential store.
pub fn client_for(server: &mockito::Server, backend: Arc<dyn KeyValueStore>) -> ApiClient {
    ApiClient::with_client(
        reqwest::Client::new(),
        server.url(),
        CredentialStore::new(backend),
    )
}

/// Same, with a signed-in session already stored.
pub async fn signed_in_client(
    server: &mockito::Server,
    access: &str,
    refresh: &str,
) -> (ApiClient, Arc<MemoryStore>) {
    let backend = Arc::new(MemoryStore::new());
    let client = client_for(server, backend.clone());
    client
        .credentials()
        .store(&sample_credentials(access, refresh))
        .await
        .unwrap();
    (client, backend)
}
