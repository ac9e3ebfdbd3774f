//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The [`PageFetcher`] seam the scheduler fetches through
//! - Building the reqwest client with a per-request timeout
//! - Sending the rotated identity as the `User-Agent` header
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::crawler::identity::IdentityRotation;
use crate::crawler::politeness::Politeness;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Why a fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// Whether another attempt could succeed
    ///
    /// | Condition | Retry |
    /// |-----------|-------|
    /// | Timeout | yes |
    /// | Network error | yes |
    /// | HTTP 5xx, 429 | yes |
    /// | Other HTTP status | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// The transport the scheduler fetches pages through
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, presenting `identity` as the client identity
    async fn fetch(&self, url: &Url, identity: &str) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with the given per-request timeout
///
/// No default `User-Agent` is set; every request carries the rotated identity.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(std::cmp::min(timeout, Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher whose requests each time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(timeout)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, identity: &str) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url.clone());
        if !identity.is_empty() {
            request = request.header(USER_AGENT, identity);
        }

        let response = request.send().await.map_err(|e| classify_error(url, e))?;
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << retry.min(16))
    }
}

/// Fetches a URL, retrying transient failures
///
/// Every attempt waits for its politeness slot and picks a fresh identity.
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &Url,
    identities: &dyn IdentityRotation,
    politeness: &Politeness,
    policy: &RetryPolicy,
) -> Result<FetchedPage, FetchError> {
    let mut retry = 0;

    loop {
        politeness.wait_turn().await;
        let identity = identities.next_identity();

        match fetcher.fetch(url, &identity).await {
            Ok(page) => return Ok(page),
            Err(e) if e.is_retryable() && retry < policy.max_retries => {
                let delay = policy.backoff(retry);
                tracing::debug!(
                    "Fetch of {} failed ({}), retry {}/{} in {:?}",
                    url,
                    e,
                    retry + 1,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
