//! Client-side error taxonomy and the server's JSON error envelope.

use serde::{Deserialize, Serialize};

/// Error envelope returned by `/api/*` endpoints on failure.
///
/// ```json
/// { "error": { "message": "Review not found", "code": "NOT_FOUND" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Attempt to pull a user-facing message out of an error response body.
pub fn try_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok()?;
    let message = parsed.error.message.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

/// API error type for client-side use
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP status (connection refused, DNS,
    /// CORS, aborted, or the client-side timeout fired).
    #[error("Network error: {message}")]
    Network { message: String, timed_out: bool },
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the client gave up waiting for a response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Network { timed_out: true, .. })
    }

    /// `401`: the server has no valid session for this client.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Message from the server's error envelope, for display on a page.
    pub fn server_message(&self) -> Option<String> {
        match self {
            ApiError::Http { body, .. } => try_error_message(body),
            _ => None,
        }
    }
}
