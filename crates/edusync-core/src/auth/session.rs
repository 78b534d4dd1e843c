use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::credentials::CredentialStore;
use super::storage::StorageError;
use crate::api::{ApiError, AuthService, LoginRequest};
use crate::models::User;

/// Message shown when the server rejects a login without explaining why
pub const DEFAULT_LOGIN_ERROR: &str = "Login failed";

#[derive(Error, Debug)]
pub enum AuthError {
    /// The server turned the credentials down. Holds the server's message.
    #[error("{0}")]
    Rejected(String),

    /// Network failure or unreadable response. Details are logged, not shown.
    #[error("Login failed - unable to reach the server")]
    Transport,

    #[error("Could not save session: {0}")]
    Storage(#[from] StorageError),
}

/// What a successful login hands to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Read-only view of the session at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub logged_in: bool,
    pub user: Option<User>,
}

/// Owns the rules for when session state is written and cleared.
///
/// Nothing is cached in memory: every query reads the credential store, so
/// a session cleared by the API client after a failed refresh is seen here
/// immediately. Construct one at startup and share clones of it.
#[derive(Clone)]
pub struct SessionManager {
    credentials: CredentialStore,
    auth: AuthService,
}

impl SessionManager {
    pub fn new(credentials: CredentialStore, auth: AuthService) -> Self {
        Self { credentials, auth }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Authenticate and persist all four credential slots in one batch.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome, AuthError> {
        let credentials = match self.auth.login(request).await {
            Ok(credentials) => credentials,
            Err(ApiError::AuthRejected { status, message }) => {
                warn!(status, email = %request.email, "Login rejected");
                return Err(AuthError::Rejected(
                    message.unwrap_or_else(|| DEFAULT_LOGIN_ERROR.to_string()),
                ));
            }
            Err(e) => {
                error!(error = %e, "Login request failed");
                return Err(AuthError::Transport);
            }
        };

        self.credentials.store(&credentials).await?;
        info!(email = %request.email, "Login successful");

        Ok(LoginOutcome {
            token: credentials.access_token,
            user: credentials.user,
        })
    }

    /// End the session. The remote call is best-effort; local credentials are
    /// cleared whatever it returns. Only a failure to clear local storage is
    /// reported.
    pub async fn logout(&self) -> Result<(), StorageError> {
        let token = match self.credentials.access_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read access token for logout");
                None
            }
        };

        if let Err(e) = self.auth.logout(token.as_deref()).await {
            warn!(error = %e, "Logout API call failed");
        }

        self.credentials.clear().await?;
        info!("Logged out");
        Ok(())
    }

    /// Whether the logged-in flag is set. Unreadable storage counts as
    /// logged out.
    pub async fn is_logged_in(&self) -> bool {
        match self.credentials.logged_in().await {
            Ok(logged_in) => logged_in,
            Err(e) => {
                warn!(error = %e, "Could not read login status");
                false
            }
        }
    }

    /// The stored user record, or `None` when it is missing, unreadable or
    /// not valid JSON.
    pub async fn current_user(&self) -> Option<User> {
        let raw = match self.credentials.user_json().await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Could not read stored user");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Stored user record is malformed");
                None
            }
        }
    }

    /// Replace only the stored user record.
    pub async fn update_user(&self, user: &User) -> bool {
        match self.credentials.update_user(user).await {
            Ok(()) => {
                debug!("Stored user updated");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to update stored user");
                false
            }
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let logged_in = self.is_logged_in().await;
        let user = if logged_in { self.current_user().await } else { None };
        SessionSnapshot { logged_in, user }
    }
}
