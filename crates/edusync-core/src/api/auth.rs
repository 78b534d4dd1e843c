//! Client for the remote authentication endpoints.
//!
//! Login and refresh are sent without a bearer token and never pass through
//! the refresh interceptor in [`ApiClient`](super::ApiClient); otherwise a
//! rejected refresh could trigger another refresh.

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::endpoints;
use super::ApiError;
use crate::auth::Credentials;

/// Identifier and secret typed into the login form.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// Login, logout and token refresh against the EduSync auth endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthService {
    client: Client,
    base_url: String,
}

impl AuthService {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Any non-2xx answer from login or refresh is a rejection, whatever the
    /// status.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::rejected(response).await)
        }
    }

    /// Exchange email and password for tokens and the user record.
    pub async fn login(&self, request: &LoginRequest) -> Result<Credentials, ApiError> {
        debug!(email = %request.email, "Sending login request");
        let response = self
            .client
            .post(self.url(endpoints::LOGIN))
            .header(header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json::<Credentials>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        debug!("Sending token refresh request");
        let response = self
            .client
            .post(self.url(endpoints::REFRESH_TOKEN))
            .header(header::ACCEPT, "application/json")
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let body: RefreshResponse = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse refresh response: {}", e))
        })?;
        if body.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Refresh response contained an empty access token".to_string(),
            ));
        }
        Ok(body.access_token)
    }

    /// Tell the server the session is over. The token is attached when known
    /// so the server can revoke it.
    pub async fn logout(&self, access_token: Option<&str>) -> Result<(), ApiError> {
        let mut request = self.client.post(self.url(endpoints::LOGOUT));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(())
    }
}
