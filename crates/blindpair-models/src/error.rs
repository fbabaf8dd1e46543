//! Error types for model parsing and configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while building or loading models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid comparison pair name: {0}")]
    InvalidPairName(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Invalid order sheet line: {0}")]
    InvalidOrderLine(String),

    #[error("Invalid study config: {0}")]
    InvalidConfig(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
