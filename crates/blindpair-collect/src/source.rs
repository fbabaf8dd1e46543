//! Response sources.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::CollectResult;
use crate::extract::{extract_json_block, extract_result_codes};
use crate::github::{GithubClient, Issue};

/// One raw response record and where it came from.
///
/// The payload is kept as JSON; shape detection happens when records are
/// adapted for decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedRecord {
    pub source: String,
    pub payload: Value,
}

/// Records retrieved from a source, with diagnostics for what was skipped.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub records: Vec<CollectedRecord>,
    /// Items inspected (issues, files, array entries)
    pub items_seen: usize,
    /// One line per skipped item
    pub skipped: Vec<String>,
    /// Error that cut retrieval short; earlier records are still valid
    pub error: Option<String>,
}

impl FetchReport {
    pub fn merge(&mut self, other: FetchReport) {
        self.records.extend(other.records);
        self.items_seen += other.items_seen;
        self.skipped.extend(other.skipped);
        if let Some(e) = other.error {
            self.error = Some(match self.error.take() {
                Some(prev) => format!("{}; {}", prev, e),
                None => e,
            });
        }
    }

    pub(crate) fn skip(&mut self, message: String) {
        warn!("{}", message);
        self.skipped.push(message);
    }
}

/// Anything that can produce response records.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    /// Human-readable description for logs and reports.
    fn describe(&self) -> String;

    /// Fetch every record available. Per-item problems are reported in the
    /// returned `FetchReport`; only an unusable source is an error.
    async fn fetch_all(&self) -> CollectResult<FetchReport>;
}

// =============================================================================
// GitHub
// =============================================================================

/// Response records filed as GitHub issues.
pub struct GithubSource {
    client: GithubClient,
}

impl GithubSource {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseSource for GithubSource {
    fn describe(&self) -> String {
        let config = self.client.config();
        format!("github:{}/{}", config.owner, config.repo)
    }

    async fn fetch_all(&self) -> CollectResult<FetchReport> {
        let fetch = self.client.fetch_issues().await;

        let mut report = FetchReport {
            items_seen: fetch.issues.len(),
            error: fetch.error,
            ..FetchReport::default()
        };

        for issue in &fetch.issues {
            match issue_to_record(issue) {
                Ok(record) => report.records.push(record),
                Err(reason) => report.skip(format!("issue #{}: {}", issue.number, reason)),
            }
        }

        Ok(report)
    }
}

/// Turn an issue body into a record.
///
/// A fenced JSON object wins; otherwise result codes become a result-code
/// record for participant `github-issue-<number>`.
pub fn issue_to_record(issue: &Issue) -> Result<CollectedRecord, String> {
    let body = issue.body.as_deref().unwrap_or_default();
    let source = format!("github#{}", issue.number);

    if let Some(block) = extract_json_block(body) {
        match serde_json::from_str::<Value>(block) {
            Ok(Value::Object(mut map)) => {
                map.insert("github_issue".into(), json!(issue.number));
                map.insert("github_url".into(), json!(issue.html_url));
                if let Some(created) = &issue.created_at {
                    map.insert("github_created_at".into(), json!(created));
                }
                return Ok(CollectedRecord {
                    source,
                    payload: Value::Object(map),
                });
            }
            Ok(_) => debug!(issue = issue.number, "JSON block is not an object"),
            Err(e) => debug!(issue = issue.number, error = %e, "JSON block does not parse"),
        }
    }

    let codes = extract_result_codes(body);
    if !codes.is_empty() {
        let mut payload = json!({
            "participantId": format!("github-issue-{}", issue.number),
            "resultCodes": codes,
            "github_issue": issue.number,
            "github_url": issue.html_url,
        });
        if let Some(created) = &issue.created_at {
            payload["github_created_at"] = json!(created);
        }
        return Ok(CollectedRecord { source, payload });
    }

    Err("no JSON record or result codes in body".to_string())
}
