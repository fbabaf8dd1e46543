//! Participant response collection.
//!
//! Production-grade sources for response records:
//! - Local result directories (`*.json` records, `*.txt` result codes)
//! - GitHub issues filed by the survey page, with pagination, retry with
//!   backoff and jitter, and duplicate-issue suppression
//! - Issue body extraction (fenced JSON or result-code lines)
//! - Observability (tracing spans, metrics)

pub mod error;
pub mod extract;
pub mod github;
pub mod local;
pub mod metrics;
pub mod output;
pub mod retry;
pub mod source;

pub use error::{CollectError, CollectResult};
pub use extract::{extract_json_block, extract_result_codes, RESULT_CODE_PATTERN};
pub use github::{GithubClient, GithubConfig, Issue, IssueFetch};
pub use local::LocalSource;
pub use output::{collection_dir, write_collection, CollectionPaths};
pub use retry::{with_retry, RetryConfig};
pub use source::{issue_to_record, CollectedRecord, FetchReport, GithubSource, ResponseSource};
