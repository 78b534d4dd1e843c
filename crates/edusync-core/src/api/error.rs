use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session may have expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The auth service turned down a login or refresh. `message` is the
    /// server's own explanation, when it sent one.
    #[error("Authentication rejected ({status}): {}", .message.as_deref().unwrap_or("no reason given"))]
    AuthRejected { status: u16, message: Option<String> },

    /// The token refresh after an auth failure did not succeed and the
    /// stored credentials were cleared. Holds the original auth error.
    #[error("Session invalidated: {0}")]
    SessionInvalidated(Box<ApiError>),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload the EduSync backend sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Statuses that mean "the bearer credential was not accepted"
pub fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Server-supplied `message` field of a JSON error body, if any.
    pub fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = Self::server_message(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            code => ApiError::Status {
                status: code,
                message: detail,
            },
        }
    }

    /// Consume a non-success response into an error.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, &body)
    }

    /// Consume a non-success response from an auth endpoint.
    pub async fn rejected(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ApiError::AuthRejected {
            status,
            message: Self::server_message(&body),
        }
    }

    /// True for 401/403-derived errors.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::Unauthorized | ApiError::AccessDenied(_) => true,
            ApiError::SessionInvalidated(inner) => inner.is_auth_failure(),
            _ => false,
        }
    }

    /// True when the error cleared the stored session.
    pub fn is_session_invalidated(&self) -> bool {
        matches!(self, ApiError::SessionInvalidated(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Network(e) if e.is_timeout())
    }

    /// HTTP status this error came from, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::Status { status, .. } | ApiError::AuthRejected { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::SessionInvalidated(inner) => inner.status(),
            _ => None,
        }
    }
}
