use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::storage::{KeyValueStore, StorageError};
use crate::models::User;

/// Storage slot names. These match the keys the mobile app has always used,
/// so an existing install keeps its session.
pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_DATA_KEY: &str = "userData";
pub const IS_LOGGED_IN_KEY: &str = "isLoggedIn";

const ALL_KEYS: [&str; 4] = [
    AUTH_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    USER_DATA_KEY,
    IS_LOGGED_IN_KEY,
];

/// Stored value of the logged-in flag. Anything else reads as logged out.
const LOGGED_IN_VALUE: &str = "true";

/// Everything a successful login hands back. Written as one batch together
/// with the logged-in flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    /// A login response without a user (or with `null`) still signs in; the
    /// record is stored empty until a profile fetch fills it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: User,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The four credential slots on top of a key-value backend.
///
/// Reads of a missing slot return `None`/`false`. Backend failures are
/// returned as `StorageError` and never retried here; callers pick the
/// fallback. Clone is cheap and every clone shares the same backend.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Write all four slots in one batch.
    pub async fn store(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&credentials.user)?;
        self.backend
            .set_many(&[
                (AUTH_TOKEN_KEY, credentials.access_token.as_str()),
                (REFRESH_TOKEN_KEY, credentials.refresh_token.as_str()),
                (USER_DATA_KEY, user_json.as_str()),
                (IS_LOGGED_IN_KEY, LOGGED_IN_VALUE),
            ])
            .await?;
        debug!("Credentials stored");
        Ok(())
    }

    pub async fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.backend.get(AUTH_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.backend.get(REFRESH_TOKEN_KEY).await
    }

    /// Raw serialized user record, exactly as stored.
    pub async fn user_json(&self) -> Result<Option<String>, StorageError> {
        self.backend.get(USER_DATA_KEY).await
    }

    pub async fn logged_in(&self) -> Result<bool, StorageError> {
        Ok(self.backend.get(IS_LOGGED_IN_KEY).await?.as_deref() == Some(LOGGED_IN_VALUE))
    }

    /// Replace the access token after a refresh. The refresh token and user
    /// record are left as they are.
    pub async fn set_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.backend.set(AUTH_TOKEN_KEY, token).await
    }

    /// Replace only the user record.
    pub async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        self.backend.set(USER_DATA_KEY, &user_json).await
    }

    /// Remove all four slots. Safe to call when nothing is stored.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove_many(&ALL_KEYS).await?;
        debug!("Credentials cleared");
        Ok(())
    }
}
