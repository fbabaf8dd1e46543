//! Retry policy with exponential backoff and jitter.
//!
//! - Exponential backoff with full jitter
//! - Respects Retry-After on 429
//! - Configurable base and max delays

use rand::Rng;
use std::time::Duration;
use tracing::{info_span, warn, Instrument};

use crate::error::{CollectError, CollectResult};
use crate::metrics::record_retry;

// =============================================================================
// Configuration
// =============================================================================

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_delay_ms: u64 = std::env::var("GITHUB_RETRY_BASE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.base_delay_ms);

        let max_delay_ms: u64 = std::env::var("GITHUB_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_delay_ms);

        Self {
            max_retries: defaults.max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Execute an async operation with retry.
///
/// Retries network errors, HTTP 429 (honoring Retry-After) and HTTP 5xx.
/// Other 4xx responses and auth errors are returned immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> CollectResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = CollectResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        let span = info_span!("github_retry", operation = %operation, attempt = attempt + 1);

        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());

                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "GitHub request failed, retrying: {}",
                    e
                );

                record_retry(attempt + 1, &e);

                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| CollectError::request_failed("Unknown error")))
}

/// Calculate retry delay with exponential backoff and full jitter.
fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after);
    }

    // base * 2^attempt, capped
    let exp_delay = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    let capped_delay = exp_delay.min(config.max_delay_ms);

    let jittered = if capped_delay > 0 {
        rand::rng().random_range(0..=capped_delay)
    } else {
        0
    };

    Duration::from_millis(jittered.max(config.base_delay_ms.min(capped_delay)))
}

// =============================================================================
// Tests
// =============================================================================
