//! Client-side core for the EduSync learning platform.
//!
//! - [`auth`]: credential persistence and the session manager
//! - [`api`]: the authenticated HTTP client with single-retry token refresh
//! - [`models`]: programs, courses, materials, assignments and exams
//! - [`config`]: user configuration and backend selection

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
mod testutil;

use anyhow::Result;

use api::ApiClient;
use auth::{CredentialStore, SessionManager};
use config::Config;

/// The session manager and API client wired to one credential store.
///
/// Both read the same slots, so a session the client invalidates after a
/// failed refresh is immediately logged out from the manager's view too.
#[derive(Clone)]
pub struct Services {
    pub session: SessionManager,
    pub api: ApiClient,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = CredentialStore::new(config.storage_backend()?);
        Ok(Self::with_credentials(config, credentials)?)
    }

    pub fn with_credentials(config: &Config, credentials: CredentialStore) -> Result<Self, api::ApiError> {
        let api = ApiClient::new(config, credentials.clone())?;
        let session = SessionManager::new(credentials, api.auth().clone());
        Ok(Self { session, api })
    }
}
