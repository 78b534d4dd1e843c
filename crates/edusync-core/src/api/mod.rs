//! REST API client module for EduSync services.
//!
//! This module provides the `ApiClient` for fetching programs, courses,
//! materials, assignments and exams, and the `AuthService` that talks to the
//! login, logout and refresh endpoints.
//!
//! Requests carry a bearer access token. When the server answers 401 or 403
//! the client refreshes the token once and resends the request.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod resources;

pub use auth::{AuthService, LoginRequest};
pub use client::{ApiClient, RequestContext, RetryState};
pub use error::ApiError;
