//! HTTP fetching for the spider
//!
//! This module handles:
//! - Building the shared HTTP client with the crawler's user agent
//! - The fetch-capability trait used for per-URL fetch strategies
//! - The default strategy: a direct, unauthenticated GET
//! - Error classification for fetch failures

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching a URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Returns the HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http { source, .. } => source.status().map(|s| s.as_u16()),
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Raw body bytes, exactly as received
    pub body: Bytes,
}

impl Page {
    /// Decodes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Returns true for a 200 OK response
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A fetch strategy for URLs matching a route
///
/// Strategies receive the spider's shared client so they can add headers,
/// credentials or a different method without building their own transport.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Fetches `url`, returning the page or a (retriable) error
    async fn crawl(&self, client: &Client, url: &str) -> Result<Page, FetchError>;
}

/// The fallback strategy: a plain GET with the shared client
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCrawler;

#[async_trait]
impl Crawler for DefaultCrawler {
    async fn crawl(&self, client: &Client, url: &str) -> Result<Page, FetchError> {
        fetch_page(url, client.get(url)).await
    }
}

/// Sends a prepared request and reads the response into a [`Page`]
///
/// Non-2xx responses are reported as [`FetchError::Status`], which makes
/// server errors retriable in the same way as network errors.
pub async fn fetch_page(url: &str, request: RequestBuilder) -> Result<Page, FetchError> {
    let http_err = |source| FetchError::Http {
        url: url.to_string(),
        source,
    };

    let response = request.send().await.map_err(http_err)?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await.map_err(http_err)?;

    Ok(Page {
        url: final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Example
///
/// ```no_run
/// use dspider::config::UserAgentConfig;
/// use dspider::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
