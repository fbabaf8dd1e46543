//! Collection error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for collection operations.
pub type CollectResult<T> = Result<T, CollectError>;

/// Errors that can occur while collecting response records.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Request failed ({status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::AuthError(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimited(0),
            500..=599 => Self::ServerError { status, message },
            _ => Self::ClientError { status, message },
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            CollectError::AuthError(_) => Some(401),
            CollectError::NotFound(_) => Some(404),
            CollectError::RateLimited(_) => Some(429),
            CollectError::ServerError { status, .. } | CollectError::ClientError { status, .. } => {
                Some(*status)
            }
            CollectError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Delay requested by the server, in milliseconds.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            CollectError::RateLimited(ms) if *ms > 0 => Some(*ms),
            _ => None,
        }
    }

    /// Check if error is retryable (network, 429, 5xx).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CollectError::Network(_) | CollectError::RateLimited(_) | CollectError::ServerError { .. }
        )
    }
}
