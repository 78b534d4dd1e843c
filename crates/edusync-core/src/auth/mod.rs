//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `KeyValueStore`: The persistence seam, with keyring, file and memory backends
//! - `CredentialStore`: Typed access to the four session slots
//! - `SessionManager`: Login, logout and session queries
//!
//! The credential store is the single source of truth for the session. Both
//! the session manager and the API client read it on every call.

pub mod credentials;
pub mod keyring_store;
pub mod session;
pub mod storage;

pub use credentials::{
    CredentialStore, Credentials, AUTH_TOKEN_KEY, IS_LOGGED_IN_KEY, REFRESH_TOKEN_KEY,
    USER_DATA_KEY,
};
pub use keyring_store::KeyringStore;
pub use session::{AuthError, LoginOutcome, SessionManager, SessionSnapshot};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
