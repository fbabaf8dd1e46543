//! CLI error type.

use blindpair_collect::CollectError;
use blindpair_media::MediaError;
use blindpair_models::ModelError;
use blindpair_study::StudyError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Study(#[from] StudyError),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}
