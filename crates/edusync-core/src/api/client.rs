//! HTTP client for the EduSync REST API.
//!
//! Every request reads the current access token from the credential store
//! and sends it as a bearer credential. When the server answers 401 or 403,
//! the client refreshes the access token once and resends the request once:
//!
//! ```text
//!   Initial --auth failure--> Retried --resend--> Done
//!      |                         |
//!      +--success/other------> Done (returned as-is)
//!                                |
//!                     refresh failed: clear credentials,
//!                     return the original error
//! ```
//!
//! Nothing is retried beyond that single refresh path. Concurrent requests
//! that all hit 401 each refresh on their own.

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::error::is_auth_failure;
use super::{ApiError, AuthService};
use crate::auth::{CredentialStore, StorageError};
use crate::config::Config;

/// Where a request is in the refresh-and-retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Not sent yet, or sent once without an auth failure
    Initial,
    /// Got an auth failure; the token was refreshed for a single resend
    Retried,
    /// Final response received
    Done,
}

/// One outbound call: the request as the caller built it, plus its retry
/// state. The request parts are never modified after construction; a resend
/// rebuilds the HTTP request from them with the refreshed token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    body: Option<Value>,
    state: RetryState,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            state: RetryState::Initial,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn state(&self) -> RetryState {
        self.state
    }
}

/// Why a token refresh could not produce a new access token.
#[derive(Error, Debug)]
enum RefreshFailure {
    #[error("no refresh token stored")]
    MissingToken,

    #[error("could not read refresh token: {0}")]
    Storage(#[from] StorageError),

    #[error("refresh rejected: {0}")]
    Remote(#[from] ApiError),
}

/// API client for EduSync.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
    auth: AuthService,
}

impl ApiClient {
    /// Create a client with the configured base URL and request timeout.
    pub fn new(config: &Config, credentials: CredentialStore) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, config.base_url(), credentials))
    }

    /// Create a client around an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>, credentials: CredentialStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let auth = AuthService::new(client.clone(), base_url.clone());
        Self {
            client,
            base_url,
            credentials,
            auth,
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Stored access token. An unreadable store is treated as "no token".
    async fn current_token(&self) -> Option<String> {
        match self.credentials.access_token().await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read access token, sending request unauthenticated");
                None
            }
        }
    }

    fn build(&self, ctx: &RequestContext, token: Option<&str>) -> RequestBuilder {
        let mut builder = self
            .client
            .request(ctx.method.clone(), self.url(&ctx.path))
            .header(header::ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = ctx.body {
            builder = builder.json(body);
        }
        builder
    }

    async fn dispatch(&self, ctx: &RequestContext, token: Option<&str>) -> Result<Response, ApiError> {
        debug!(
            method = %ctx.method,
            path = %ctx.path,
            authenticated = token.is_some(),
            state = ?ctx.state,
            "Sending HTTP request"
        );

        self.build(ctx, token).send().await.map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connection_failed"
            } else if e.is_request() {
                "request_error"
            } else {
                "unknown"
            };
            warn!(error_kind, error = %e, path = %ctx.path, "HTTP request error");
            ApiError::Network(e)
        })
    }

    /// Send a request, refreshing the access token once on an auth failure.
    ///
    /// Returns the response for 2xx statuses. Every other status comes back
    /// as the matching `ApiError`. If the refresh itself fails the stored
    /// credentials are cleared and the original auth error is returned
    /// wrapped in `ApiError::SessionInvalidated`.
    pub async fn execute(&self, ctx: &mut RequestContext) -> Result<Response, ApiError> {
        let mut token = self.current_token().await;

        loop {
            let response = self.dispatch(ctx, token.as_deref()).await?;
            let status = response.status();

            if status.is_success() {
                ctx.state = RetryState::Done;
                return Ok(response);
            }

            let error = ApiError::from_response(response).await;
            if !is_auth_failure(status) {
                ctx.state = RetryState::Done;
                return Err(error);
            }

            match ctx.state {
                RetryState::Initial => {
                    ctx.state = RetryState::Retried;
                    warn!(status = status.as_u16(), path = %ctx.path, "Auth failure, refreshing access token");

                    match self.refresh_access_token().await {
                        Ok(fresh) => token = Some(fresh),
                        Err(e) => {
                            warn!(error = %e, "Token refresh failed, invalidating session");
                            self.invalidate_session().await;
                            ctx.state = RetryState::Done;
                            return Err(ApiError::SessionInvalidated(Box::new(error)));
                        }
                    }
                }
                RetryState::Retried | RetryState::Done => {
                    warn!(status = status.as_u16(), path = %ctx.path, "Auth failure after refresh, giving up");
                    ctx.state = RetryState::Done;
                    return Err(error);
                }
            }
        }
    }

    async fn refresh_access_token(&self) -> Result<String, RefreshFailure> {
        let refresh_token = self
            .credentials
            .refresh_token()
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(RefreshFailure::MissingToken)?;

        let access_token = self.auth.refresh(&refresh_token).await?;

        if let Err(e) = self.credentials.set_access_token(&access_token).await {
            // The resend still uses the fresh token; the next request will
            // refresh again.
            warn!(error = %e, "Failed to persist refreshed access token");
        }
        info!("Access token refreshed");
        Ok(access_token)
    }

    async fn invalidate_session(&self) {
        if let Err(e) = self.credentials.clear().await {
            error!(error = %e, "Failed to clear credentials after refresh failure");
        }
    }

    /// Send a request and decode the JSON body. An empty body decodes as
    /// `null`, so `()` and `Option<T>` work for endpoints that return nothing.
    pub async fn send_json<T: DeserializeOwned>(&self, mut ctx: RequestContext) -> Result<T, ApiError> {
        let response = self.execute(&mut ctx).await?;
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", ctx.path, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(RequestContext::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(RequestContext::post(path).with_json(body)?).await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(RequestContext::post(path)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(RequestContext::put(path).with_json(body)?).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testutil::{client_for, sample_credentials, signed_in_client, FlakyStore};
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_no_token_sends_no_authorization_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/programs")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = client_for(&server, Arc::new(crate::auth::MemoryStore::new()));
        let programs: Vec<Value> = client.get("/programs").await.unwrap();
        mock.assert_async().await;
        assert!(programs.is_empty());
    }

    #[tokio::test]
    async fn test_stored_token_is_attached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/courses")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_body(r#"[{"id":1}]"#)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let courses: Vec<Value> = client.get("/courses").await.unwrap();
        mock.assert_async().await;
        assert_eq!(courses.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_token_sends_unauthenticated() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/materials")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let backend = Arc::new(FlakyStore::new());
        let client = client_for(&server, backend.clone());
        client
            .credentials()
            .store(&sample_credentials("access-1", "refresh-1"))
            .await
            .unwrap();
        backend.fail_reads(true);

        let _: Vec<Value> = client.get("/materials").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_401_refreshes_and_resends_once() {
        let mut server = mockito::Server::new_async().await;
        let stale = server
            .mock("GET", "/assignments")
            .match_header("authorization", "Bearer access-1")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .match_body(Matcher::Json(json!({"refreshToken": "refresh-1"})))
            .with_status(200)
            .with_body(r#"{"accessToken":"access-2"}"#)
            .expect(1)
            .create_async()
            .await;
        let fresh = server
            .mock("GET", "/assignments")
            .match_header("authorization", "Bearer access-2")
            .with_status(200)
            .with_body(r#"[{"id":9}]"#)
            .expect(1)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let mut ctx = RequestContext::get("/assignments");
        let response = client.execute(&mut ctx).await.unwrap();
        let body: Value = response.json().await.unwrap();

        stale.assert_async().await;
        refresh.assert_async().await;
        fresh.assert_async().await;
        assert_eq!(body, json!([{"id": 9}]));
        assert_eq!(ctx.state(), RetryState::Done);

        let creds = client.credentials();
        assert_eq!(creds.access_token().await.unwrap().as_deref(), Some("access-2"));
        assert_eq!(creds.refresh_token().await.unwrap().as_deref(), Some("refresh-1"));
        assert!(creds.logged_in().await.unwrap());
    }

    #[tokio::test]
    async fn test_resend_failure_is_final_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/exams")
            .match_header("authorization", "Bearer access-1")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"accessToken":"access-2"}"#)
            .expect(1)
            .create_async()
            .await;
        let resend = server
            .mock("GET", "/exams")
            .match_header("authorization", "Bearer access-2")
            .with_status(500)
            .with_body(r#"{"message":"database unavailable"}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let err = client.get::<Value>("/exams").await.unwrap_err();

        refresh.assert_async().await;
        resend.assert_async().await;
        assert!(matches!(err, ApiError::ServerError(ref m) if m == "database unavailable"));
    }

    #[tokio::test]
    async fn test_consecutive_401s_refresh_only_once() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/user/profile")
            .match_header("authorization", "Bearer access-1")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"accessToken":"access-2"}"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/user/profile")
            .match_header("authorization", "Bearer access-2")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let (client, backend) = signed_in_client(&server, "access-1", "refresh-1").await;
        let mut ctx = RequestContext::get("/user/profile");
        let err = client.execute(&mut ctx).await.unwrap_err();

        first.assert_async().await;
        refresh.assert_async().await;
        second.assert_async().await;
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(ctx.state(), RetryState::Done);
        // The refresh itself succeeded, so the session is kept
        assert!(!backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_refresh_rejected_clears_session() {
        let mut server = mockito::Server::new_async().await;
        let original = server
            .mock("GET", "/programs/enrolled")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_body(r#"{"message":"refresh token expired"}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, backend) = signed_in_client(&server, "access-1", "refresh-1").await;
        let err = client.get::<Value>("/programs/enrolled").await.unwrap_err();

        original.assert_async().await;
        refresh.assert_async().await;
        assert!(backend.is_empty().await);
        assert!(err.is_auth_failure());
        assert_eq!(err.status(), Some(401));
        match err {
            ApiError::SessionInvalidated(inner) => assert!(matches!(*inner, ApiError::Unauthorized)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_refresh_token_clears_session_without_refresh_call() {
        let mut server = mockito::Server::new_async().await;
        let original = server
            .mock("GET", "/courses/3")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let (client, backend) = signed_in_client(&server, "access-1", "").await;
        let err = client.get::<Value>("/courses/3").await.unwrap_err();

        original.assert_async().await;
        refresh.assert_async().await;
        assert!(matches!(err, ApiError::SessionInvalidated(_)));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_403_also_triggers_refresh() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/exams/4/start")
            .match_header("authorization", "Bearer access-1")
            .with_status(403)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"accessToken":"access-2"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/exams/4/start")
            .match_header("authorization", "Bearer access-2")
            .with_status(200)
            .with_body(r#"{"started":true}"#)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let body: Value = client.post_empty("/exams/4/start").await.unwrap();
        refresh.assert_async().await;
        assert_eq!(body["started"], json!(true));
    }

    #[tokio::test]
    async fn test_other_errors_pass_through_without_refresh() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/materials/77/download")
            .with_status(404)
            .with_body(r#"{"message":"Material not found"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/programs")
            .with_status(503)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let (client, backend) = signed_in_client(&server, "access-1", "refresh-1").await;

        let err = client.get::<Value>("/materials/77/download").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Material not found"));

        let err = client.get::<Value>("/programs").await.unwrap_err();
        assert!(matches!(err, ApiError::ServerError(_)));

        refresh.assert_async().await;
        assert!(!backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_unit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/user/profile")
            .match_body(Matcher::Json(json!({"name": "Ada King"})))
            .with_status(204)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let _: () = client.put("/user/profile", &json!({"name": "Ada King"})).await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let backend = Arc::new(crate::auth::MemoryStore::new());
        // Port 9 (discard) on localhost is not expected to accept connections
        let client = ApiClient::with_client(
            Client::new(),
            "http://127.0.0.1:9",
            CredentialStore::new(backend),
        );
        let err = client.get::<Value>("/programs").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
