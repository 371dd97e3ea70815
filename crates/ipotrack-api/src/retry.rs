// Retry logic with exponential backoff for feed downloads
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,  // Start with 1 second
            max_delay_ms: 30000,     // Max 30 seconds
            backoff_multiplier: 2.0, // Double each time
        }
    }
}

impl RetryConfig {
    /// No retries at all - one attempt and done
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn next_delay(&self, delay_ms: u64) -> u64 {
        let next = ((delay_ms as f64) * self.backoff_multiplier) as u64;
        next.min(self.max_delay_ms)
    }
}

/// Execute an operation, retrying every failure
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_when(config, operation, |_| true).await
}

/// Execute an operation, retrying only the failures `should_retry` accepts
///
/// A 404 on the sheet will still be a 404 in two seconds, so callers get to
/// decide which errors are worth waiting for.
pub async fn with_retry_when<F, Fut, T, E, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retries = 0;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("Feed fetched after {} retries", retries);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !should_retry(&err) {
            debug!("Not retrying: {}", err);
            return Err(err);
        }

        if retries >= config.max_retries {
            warn!("Giving up after {} attempts: {}", retries + 1, err);
            return Err(err);
        }

        retries += 1;
        warn!(
            "Fetch attempt {} of {} failed: {}. Retrying in {}ms",
            retries,
            config.max_retries + 1,
            err,
            delay_ms
        );

        sleep(Duration::from_millis(delay_ms)).await;
        delay_ms = config.next_delay(delay_ms);
    }
}

/// Check if an HTTP status code is retryable
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    // 5xx, 429 and 408 are worth another go; everything else won't change
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}
