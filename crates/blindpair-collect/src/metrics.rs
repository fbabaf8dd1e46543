//! Issue-listing metrics.
//!
//! One sample per page request (page, outcome, HTTP status, latency), a
//! running count of issues received, and one sample per retry labelled with
//! the attempt that follows and the failure that caused it.

use metrics::{counter, histogram};
use std::time::Duration;

use crate::error::CollectError;

pub mod names {
    /// Page requests by `page`, `outcome` and `status`.
    pub const REQUESTS_TOTAL: &str = "github_requests_total";
    /// Page request latency by `outcome`.
    pub const LATENCY_SECONDS: &str = "github_latency_seconds";
    /// Issues received across all pages, pull requests included.
    pub const ISSUES_RECEIVED_TOTAL: &str = "github_issues_received_total";
    /// Retries by `attempt` and `reason`.
    pub const RETRIES_TOTAL: &str = "github_retries_total";
}

/// Pages at or past this number share one label.
const PAGE_LABEL_CAP: u32 = 10;

fn page_label(page: u32) -> String {
    if page >= PAGE_LABEL_CAP {
        format!("{}+", PAGE_LABEL_CAP)
    } else {
        page.to_string()
    }
}

/// Short label for why a request failed.
pub fn failure_reason(error: &CollectError) -> &'static str {
    match error {
        CollectError::AuthError(_) => "auth",
        CollectError::NotFound(_) => "not_found",
        CollectError::RateLimited(_) => "rate_limited",
        CollectError::ServerError { .. } => "server_error",
        CollectError::ClientError { .. } => "client_error",
        CollectError::Network(_) | CollectError::RequestFailed(_) => "network",
        CollectError::InvalidResponse(_) | CollectError::Json(_) => "invalid_response",
        CollectError::InvalidConfig(_) | CollectError::DirectoryNotFound(_) | CollectError::Io(_) => {
            "local"
        }
    }
}

/// Record one finished page request. `received` is the number of issues on
/// the page, or the error that ended the request.
pub fn record_page(page: u32, latency: Duration, received: Result<usize, &CollectError>) {
    let (outcome, status) = match received {
        Ok(_) => ("ok", "200".to_string()),
        Err(e) => (
            failure_reason(e),
            e.http_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
    };

    counter!(
        names::REQUESTS_TOTAL,
        "page" => page_label(page),
        "outcome" => outcome,
        "status" => status
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "outcome" => outcome).record(latency.as_secs_f64());

    if let Ok(count) = received {
        counter!(names::ISSUES_RECEIVED_TOTAL).increment(count as u64);
    }
}

/// Record that `attempt` (1-based) is about to be retried after `error`.
pub fn record_retry(attempt: u32, error: &CollectError) {
    counter!(
        names::RETRIES_TOTAL,
        "attempt" => (attempt + 1).to_string(),
        "reason" => failure_reason(error)
    )
    .increment(1);
}
