//! Error types for the study engine.
//!
//! `StudyError` is reserved for conditions that stop a run. Per-item
//! problems (undecodable choices, malformed records, failed renders) are
//! values that get tallied, see [`DecodeError`] and [`MalformedRecord`].

use blindpair_collect::CollectError;
use blindpair_media::MediaError;
use blindpair_models::{DecodeStatus, ModelError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for study operations.
pub type StudyResult<T> = Result<T, StudyError>;

/// Run-level failures.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Collection error: {0}")]
    Collect(#[from] CollectError),

    #[error("No order sheet found for any pair (looked in: {})", display_paths(.0))]
    NoOrderSheets(Vec<PathBuf>),

    #[error("Order sheet not found: {0}")]
    OrderSheetNotFound(PathBuf),

    #[error("Unknown comparison pair: {0}")]
    UnknownPair(String),

    #[error("Invalid index mapping: {0}")]
    InvalidMapping(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StudyError {
    pub fn invalid_mapping(msg: impl Into<String>) -> Self {
        Self::InvalidMapping(msg.into())
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a single choice could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no order sheet for pair {pair}")]
    OrderSheetMissing { pair: String },

    #[error("{identity} not in order sheet of {pair}")]
    LookupMiss { pair: String, identity: String },

    #[error("invalid choice {choice:?}")]
    InvalidChoice { choice: String },
}

impl DecodeError {
    /// Status recorded for the choice in the run summary.
    pub fn status(&self) -> DecodeStatus {
        match self {
            DecodeError::OrderSheetMissing { .. } => DecodeStatus::OrderSheetMissing,
            DecodeError::LookupMiss { .. } => DecodeStatus::LookupMiss,
            DecodeError::InvalidChoice { .. } => DecodeStatus::InvalidChoice,
        }
    }
}

/// A response record that yielded nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_name}: {reason}")]
pub struct MalformedRecord {
    pub source_name: String,
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_status() {
        let miss = DecodeError::LookupMiss {
            pair: "foo_vs_bar".into(),
            identity: "v9".into(),
        };
        assert_eq!(miss.status(), DecodeStatus::LookupMiss);
        assert_eq!(miss.to_string(), "v9 not in order sheet of foo_vs_bar");

        let invalid = DecodeError::InvalidChoice { choice: "C".into() };
        assert_eq!(invalid.status(), DecodeStatus::InvalidChoice);
    }

    #[test]
    fn test_no_order_sheets_lists_paths() {
        let err = StudyError::NoOrderSheets(vec![PathBuf::from("a/order_sheet.txt")]);
        assert!(err.to_string().contains("a/order_sheet.txt"));
    }
}
