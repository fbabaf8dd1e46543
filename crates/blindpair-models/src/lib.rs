//! Shared data models for the blind preference study.
//!
//! This crate provides Serde-serializable types for:
//! - Identities and their filename normalization
//! - Comparison pairs and A/B labels
//! - Order sheet entries (the ground-truth label assignment)
//! - Participant response records
//! - Study and encoding configuration
//! - Decoded choices, win statistics and run summaries

pub mod encoding;
pub mod error;
pub mod identity;
pub mod label;
pub mod order;
pub mod pair;
pub mod report;
pub mod response;
pub mod study;

// Re-export common types
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use identity::{Identity, COMPARISON_INFIX, VIDEO_EXTENSIONS};
pub use label::Label;
pub use order::{OrderSheetEntry, MODEL_A_SEPARATOR, MODEL_B_SEPARATOR};
pub use pair::ComparisonPair;
pub use report::{
    DecodeStatus, DecodedChoice, FailureCounts, PairStats, PairTally, QuestionStats, ResponseRow,
    RunSummary, StudyReport, WinStats,
};
pub use response::{ChoiceValue, ResponseRecord, ResultCodeRecord, StructuredChoice};
pub use study::{
    ComparisonSetConfig, GithubSection, ResultCodeSection, StudyConfig, DEFAULT_QUESTION,
    DEFAULT_SEED, INDEX_MAPPING_FILENAME, ORDER_SHEET_FILENAME,
};
