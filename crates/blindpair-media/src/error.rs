//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid video error.
    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-friendly kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            MediaError::FfmpegNotFound => "ffmpeg_not_found",
            MediaError::FfprobeNotFound => "ffprobe_not_found",
            MediaError::FfmpegFailed { .. } => "ffmpeg_failed",
            MediaError::FfprobeFailed { .. } => "ffprobe_failed",
            MediaError::FileNotFound(_) => "file_not_found",
            MediaError::DirectoryNotFound(_) => "directory_not_found",
            MediaError::Timeout(_) => "timeout",
            MediaError::Io(_) => "io",
            MediaError::JsonParse(_) => "json",
            MediaError::InvalidVideo(_) => "invalid_video",
            MediaError::Internal(_) => "internal",
        }
    }
}
