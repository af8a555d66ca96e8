use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::auth::AuthError;

use super::resource::{Access, ApiMode, Resource};

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Status plus the best-effort message and detail pulled from an error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorBody {
    /// Pull `error` (or `message`) and `detail` out of a JSON error body.
    /// Non-JSON bodies become the message, truncated; an empty body falls
    /// back to the status reason phrase.
    pub fn parse(status: StatusCode, body: &str) -> Self {
        let json = serde_json::from_str::<Value>(body).ok();
        let message = json
            .as_ref()
            .and_then(|v| field_text(v, "error").or_else(|| field_text(v, "message")))
            .or_else(|| {
                let trimmed = body.trim();
                // A JSON body without the usual fields is shown whole
                (!trimmed.is_empty()).then(|| Self::truncate_body(trimmed))
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        let detail = json.as_ref().and_then(|v| field_text(v, "detail"));

        Self {
            status: status.as_u16(),
            message,
            detail,
        }
    }

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
}

/// A string field as-is, any other non-null JSON rendered compactly.
fn field_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.detail {
            Some(ref detail) => write!(f, "{} ({})", self.message, detail),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(ErrorBody),

    #[error("Unauthorized - please log in again: {0}")]
    Unauthorized(ErrorBody),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorBody),

    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    #[error("Conflict: {0}")]
    Conflict(ErrorBody),

    #[error("Rate limited: {0}")]
    RateLimited(ErrorBody),

    #[error("Server error: {0}")]
    ServerError(ErrorBody),

    #[error("HTTP {}: {}", .0.status, .0)]
    Http(ErrorBody),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{mode} mode cannot {access} {resource}")]
    UnsupportedMode {
        mode: ApiMode,
        resource: Resource,
        access: Access,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let parsed = ErrorBody::parse(status, body);
        match status.as_u16() {
            400 | 422 => ApiError::BadRequest(parsed),
            401 => ApiError::Unauthorized(parsed),
            403 => ApiError::AccessDenied(parsed),
            404 => ApiError::NotFound(parsed),
            409 => ApiError::Conflict(parsed),
            429 => ApiError::RateLimited(parsed),
            500..=599 => ApiError::ServerError(parsed),
            _ => ApiError::Http(parsed),
        }
    }

    /// The HTTP error body, for errors that came from a response
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::BadRequest(b)
            | ApiError::Unauthorized(b)
            | ApiError::AccessDenied(b)
            | ApiError::NotFound(b)
            | ApiError::Conflict(b)
            | ApiError::RateLimited(b)
            | ApiError::ServerError(b)
            | ApiError::Http(b) => Some(b),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.body().map(|b| b.status)
    }

    /// Whether the user has to sign in again before anything else works
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_)
                | ApiError::Auth(AuthError::NotLoggedIn)
                | ApiError::Auth(AuthError::ReauthenticationRequired)
        )
    }
}
