//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a descriptive user agent
//! - Bounded-time GET requests for pages and sitemaps
//! - Aborting in-flight requests on cancellation
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// A completed HTTP exchange
///
/// Any status code, including 4xx and 5xx, is a completed exchange.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Response body decoded as text
    pub body: String,

    /// Wall time from sending the request to reading the whole body
    pub elapsed_ms: u64,
}

/// Network-level failure of a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if error.is_body() || error.is_decode() {
            Self::Body(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Every request carries the configured user agent plus `Accept` and
/// `Accept-Language` headers. Redirects are followed with reqwest's default
/// policy.
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use crawl_lab::config::UserAgentConfig;
/// use crawl_lab::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

    Client::builder()
        .user_agent(config.header_value())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL within a hard time limit
///
/// The limit covers the whole exchange, body included. When `cancel` fires
/// first, the in-flight request is dropped and `FetchError::Cancelled` is
/// returned.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `timeout` - Upper bound for the whole exchange
/// * `cancel` - Token observed while the request is in flight
pub async fn fetch_url(
    client: &Client,
    url: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<FetchedPage, FetchError> {
    let started = Instant::now();

    let exchange = async {
        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        Ok::<_, FetchError>((final_url, status_code, body))
    };

    let (final_url, status_code, body) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        result = tokio::time::timeout(timeout, exchange) => match result {
            Ok(exchange) => exchange?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        },
    };

    Ok(FetchedPage {
        final_url,
        status_code,
        body,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}
