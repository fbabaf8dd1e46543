//! GitHub issues client.
//!
//! Lists the issues the survey page files per participant:
//! - Label and state filtering, page-by-page until an empty or short page
//! - Pull requests filtered out, issues de-duplicated by number
//! - Exponential backoff with jitter on network errors, 429 and 5xx
//! - A page that still fails ends pagination; earlier pages are kept

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{CollectError, CollectResult};
use crate::metrics::record_page;
use crate::retry::{with_retry, RetryConfig};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Label the survey page attaches to result issues.
pub const DEFAULT_LABEL: &str = "user-study-result";
/// GitHub's page size limit.
pub const MAX_PER_PAGE: u32 = 100;

// =============================================================================
// Configuration
// =============================================================================

/// GitHub collection configuration.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API root, overridable for GitHub Enterprise and tests
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// Personal access token; anonymous requests when absent
    pub token: Option<String>,
    /// Label filter; `None` lists every issue
    pub label: Option<String>,
    /// "open", "closed" or "all"
    pub state: String,
    pub per_page: u32,
    /// Hard stop on pagination
    pub max_pages: u32,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: String::new(),
            repo: String::new(),
            token: None,
            label: Some(DEFAULT_LABEL.to_string()),
            state: "all".to_string(),
            per_page: MAX_PER_PAGE,
            max_pages: 100,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

impl GithubConfig {
    /// Create config from environment variables.
    ///
    /// Owner and repo may be left empty here and filled from the study config.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let per_page: u32 = std::env::var("GITHUB_PER_PAGE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.per_page);

        let label = match std::env::var("GITHUB_LABEL") {
            Ok(l) if l.trim().is_empty() => None,
            Ok(l) => Some(l),
            Err(_) => defaults.label,
        };

        Self {
            api_url: std::env::var("GITHUB_API_URL").unwrap_or(defaults.api_url),
            owner: std::env::var("GITHUB_OWNER").unwrap_or_default(),
            repo: std::env::var("GITHUB_REPO").unwrap_or_default(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            label,
            state: std::env::var("GITHUB_STATE").unwrap_or(defaults.state),
            per_page,
            retry: RetryConfig::from_env(),
            ..defaults
        }
    }

    /// Set owner and repository.
    pub fn with_repo(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.owner = owner.into();
        self.repo = repo.into();
        self
    }

    pub fn validate(&self) -> CollectResult<()> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(CollectError::invalid_config(
                "GitHub owner and repo must be set (GITHUB_OWNER/GITHUB_REPO or study config)",
            ));
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(CollectError::invalid_config(format!(
                "per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, self.per_page
            )));
        }
        if !matches!(self.state.as_str(), "open" | "closed" | "all") {
            return Err(CollectError::invalid_config(format!(
                "state must be open, closed or all, got '{}'",
                self.state
            )));
        }
        Ok(())
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

// =============================================================================
// Types
// =============================================================================

/// The fields of a GitHub issue this crate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present only on pull requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Result of listing all pages.
#[derive(Debug, Clone, Default)]
pub struct IssueFetch {
    pub issues: Vec<Issue>,
    pub pages: u32,
    pub pull_requests_skipped: usize,
    pub duplicates_skipped: usize,
    /// Error that ended pagination early
    pub error: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// GitHub REST API client.
#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    config: GithubConfig,
}

impl GithubClient {
    /// Create a new client.
    pub fn new(config: GithubConfig) -> CollectResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("blindpair-collect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CollectError::Network)?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// List every issue, page by page.
    ///
    /// Never fails: a page that cannot be fetched or parsed after retries ends
    /// pagination and is recorded in `IssueFetch::error`.
    pub async fn fetch_issues(&self) -> IssueFetch {
        let mut fetch = IssueFetch::default();
        let mut seen = HashSet::new();

        for page in 1..=self.config.max_pages {
            let result = with_retry(&self.config.retry, "list_issues", || {
                self.list_issues_page(page)
            })
            .await;

            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(page, error = %e, "Stopping pagination, keeping earlier pages");
                    fetch.error = Some(format!("page {}: {}", page, e));
                    break;
                }
            };

            fetch.pages += 1;
            let page_len = batch.len();
            debug!(page, issues = page_len, "Fetched issue page");

            for issue in batch {
                if issue.is_pull_request() {
                    fetch.pull_requests_skipped += 1;
                } else if !seen.insert(issue.number) {
                    fetch.duplicates_skipped += 1;
                } else {
                    fetch.issues.push(issue);
                }
            }

            if page_len < self.config.per_page as usize {
                break;
            }
        }

        info!(
            issues = fetch.issues.len(),
            pages = fetch.pages,
            pull_requests = fetch.pull_requests_skipped,
            duplicates = fetch.duplicates_skipped,
            "Issue listing finished"
        );
        fetch
    }

    /// Fetch one page of issues.
    pub async fn list_issues_page(&self, page: u32) -> CollectResult<Vec<Issue>> {
        let url = self.config.issues_url();

        self.execute_request("list_issues", page, async {
            let per_page = self.config.per_page.to_string();
            let page_str = page.to_string();

            let mut request = self
                .http
                .get(&url)
                .header(ACCEPT, "application/vnd.github+json")
                .query(&[
                    ("state", self.config.state.as_str()),
                    ("per_page", per_page.as_str()),
                    ("page", page_str.as_str()),
                ]);
            if let Some(label) = &self.config.label {
                request = request.query(&[("labels", label.as_str())]);
            }
            if let Some(token) = &self.config.token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                let text = response.text().await?;
                return serde_json::from_str::<Vec<Issue>>(&text).map_err(|e| {
                    CollectError::InvalidResponse(format!("{} page {}: {}", url, page, e))
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS || is_rate_limit_exhausted(&response) {
                return Err(CollectError::RateLimited(retry_after_ms(&response)));
            }

            Err(Self::handle_error_response(status, &url, response).await)
        })
        .await
    }

    /// Run one page request inside a span and record its page metrics.
    async fn execute_request<F>(&self, operation: &str, page: u32, fut: F) -> CollectResult<Vec<Issue>>
    where
        F: std::future::Future<Output = CollectResult<Vec<Issue>>>,
    {
        let span = info_span!(
            "github_request",
            operation = %operation,
            repo = %format!("{}/{}", self.config.owner, self.config.repo),
            page
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        record_page(page, start.elapsed(), result.as_ref().map(Vec::len));

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> CollectError {
        let body = response.text().await.unwrap_or_default();
        CollectError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

/// GitHub signals primary rate limiting with 403 and a zero remaining quota.
fn is_rate_limit_exhausted(response: &reqwest::Response) -> bool {
    response.status() == StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0")
}

/// Retry-After in milliseconds; 0 when absent.
fn retry_after_ms(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
        .unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer, per_page: u32) -> GithubConfig {
        GithubConfig {
            api_url: server.uri(),
            token: Some("test-token".to_string()),
            per_page,
            retry: RetryConfig {
                max_retries: 2,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
            ..GithubConfig::default()
        }
        .with_repo("lab", "study")
    }

    fn issue(number: u64) -> Value {
        json!({
            "number": number,
            "title": format!("Result {}", number),
            "body": "```json\n{}\n```",
            "html_url": format!("https://github.com/lab/study/issues/{}", number),
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_paginates_until_short_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .and(query_param("page", "1"))
            .and(query_param("labels", DEFAULT_LABEL))
            .and(query_param("state", "all"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(1), issue(2)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(3)])))
            .mount(&server)
            .await;

        let client = GithubClient::new(test_config(&server, 2)).unwrap();
        let fetch = client.fetch_issues().await;

        assert_eq!(fetch.pages, 2);
        assert!(fetch.error.is_none());
        let numbers: Vec<u64> = fetch.issues.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_filters_pull_requests_and_duplicates() {
        let server = MockServer::start().await;

        let mut pr = issue(5);
        pr["pull_request"] = json!({"url": "https://api.github.com/pulls/5"});

        // Page 2 repeats issue 2, as happens when issues are filed mid-listing.
        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(1), issue(2)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(2), pr])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = GithubClient::new(test_config(&server, 2)).unwrap();
        let fetch = client.fetch_issues().await;

        assert_eq!(fetch.issues.len(), 2);
        assert_eq!(fetch.duplicates_skipped, 1);
        assert_eq!(fetch.pull_requests_skipped, 1);
        assert_eq!(fetch.pages, 3);
    }

    #[tokio::test]
    async fn test_error_page_keeps_earlier_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(1)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let client = GithubClient::new(test_config(&server, 1)).unwrap();
        let fetch = client.fetch_issues().await;

        assert_eq!(fetch.issues.len(), 1);
        assert!(fetch.error.is_some());
    }

    #[tokio::test]
    async fn test_malformed_page_is_zero_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = GithubClient::new(test_config(&server, 100)).unwrap();
        let fetch = client.fetch_issues().await;

        assert!(fetch.issues.is_empty());
        assert!(fetch.error.unwrap().contains("page 1"));
    }

    #[tokio::test]
    async fn test_retries_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/lab/study/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(7)])))
            .mount(&server)
            .await;

        let client = GithubClient::new(test_config(&server, 100)).unwrap();
        let fetch = client.fetch_issues().await;

        assert!(fetch.error.is_none());
        assert_eq!(fetch.issues.len(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(GithubConfig::default().validate().is_err());
        assert!(GithubConfig::default().with_repo("o", "r").validate().is_ok());

        let bad_page = GithubConfig {
            per_page: 500,
            ..GithubConfig::default().with_repo("o", "r")
        };
        assert!(bad_page.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("GITHUB_OWNER", "lab");
        std::env::set_var("GITHUB_REPO", "study");
        std::env::set_var("GITHUB_LABEL", "");
        std::env::remove_var("GITHUB_PER_PAGE");
        std::env::remove_var("GITHUB_STATE");

        let config = GithubConfig::from_env();
        assert_eq!(config.owner, "lab");
        assert_eq!(config.repo, "study");
        assert_eq!(config.label, None);
        assert_eq!(config.per_page, MAX_PER_PAGE);
        assert_eq!(config.state, "all");

        std::env::remove_var("GITHUB_OWNER");
        std::env::remove_var("GITHUB_REPO");
        std::env::remove_var("GITHUB_LABEL");
    }
}
