use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry_when, RetryConfig};

/// The published IPO sheet, exported as CSV
pub const DEFAULT_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vRlsMurbsXT2UBQ2ADbyoiQtLUTznQU4vNzw3nS02_StSrFV9pkrnXOrNAjV_Yj-Byc_zw72z_rM0tQ/pub?output=csv";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Feed not found: {0}")]
    NotFound(String),

    #[error("Feed request timed out: {0}")]
    Timeout(String),

    #[error("Feed server unavailable: {0}")]
    ServerError(String),

    #[error("Feed request failed: {0}")]
    RequestFailed(String),
}

impl FeedError {
    /// Whether waiting and asking again could plausibly help
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::NetworkError(e) => !e.is_builder() && !e.is_decode(),
            FeedError::Timeout(_) | FeedError::ServerError(_) => true,
            FeedError::NotFound(_) => false,
            FeedError::RequestFailed(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

/// Downloads the raw CSV body of a published spreadsheet
pub struct SheetClient {
    client: reqwest::Client,
    url: String,
    retry_config: RetryConfig,
}

impl SheetClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("IPOTrack/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("text/csv, text/plain;q=0.9, */*;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Swap in a custom retry configuration
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the sheet body as text
    pub async fn fetch(&self) -> Result<String> {
        with_retry_when(
            &self.retry_config,
            || async { self.fetch_once().await },
            FeedError::is_retryable,
        )
        .await
    }

    async fn fetch_once(&self) -> Result<String> {
        debug!("GET {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| classify_transport_error(&self.url, e))?;

        let status = response.status();
        if let Some(err) = classify_status(&self.url, status) {
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&self.url, e))?;
        debug!("Fetched {} bytes from {}", body.len(), self.url);
        Ok(body)
    }
}

fn classify_transport_error(url: &str, err: reqwest::Error) -> FeedError {
    if err.is_timeout() {
        FeedError::Timeout(url.to_string())
    } else {
        FeedError::NetworkError(err)
    }
}

/// Map a non-success HTTP status to a feed error; `None` means carry on
fn classify_status(url: &str, status: reqwest::StatusCode) -> Option<FeedError> {
    if status.is_success() {
        return None;
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Some(FeedError::NotFound(url.to_string()));
    }

    if status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::GATEWAY_TIMEOUT
    {
        return Some(FeedError::Timeout(format!("{} (status {})", url, status)));
    }

    if is_retryable_status(status) {
        return Some(FeedError::ServerError(format!("Status {} from {}", status, url)));
    }

    Some(FeedError::RequestFailed(format!("Status {} from {}", status, url)))
}
