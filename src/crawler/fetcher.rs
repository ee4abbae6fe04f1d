//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the configured user agent
//! - Bounded-timeout GET requests for single pages
//! - Error classification (timeout, non-2xx status, network failure)
//! - The `PageSource` capability the content assembler consumes

use crate::config::{ClientConfig, ExtractionRule};
use crate::crawler::parser::{extract_page, ChapterSelectors, ExtractedPage};
use crate::{ConfigError, NovelError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches one chapter page and extracts its content and next-page link
///
/// This is the only capability the assembler needs from the network layer,
/// which keeps site rules and transport out of the pagination loop.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_and_extract(&self, url: &Url) -> Result<ExtractedPage, NovelError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The client configuration (user agent)
/// * `timeout` - Default timeout applied to every request
///
/// # Example
///
/// ```no_run
/// use novel_ripple::config::ClientConfig;
/// use novel_ripple::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&ClientConfig::default(), Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs one GET request and returns the decoded body
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Request exceeded `timeout` | `NovelError::Timeout` |
/// | Non-2xx status | `NovelError::HttpStatus` |
/// | Connection or body failure | `NovelError::Fetch` |
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> Result<String, NovelError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NovelError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| classify_error(url, e))
}

fn classify_error(url: &str, error: reqwest::Error) -> NovelError {
    if error.is_timeout() {
        NovelError::Timeout {
            url: url.to_string(),
        }
    } else {
        NovelError::Fetch {
            url: url.to_string(),
            source: error,
        }
    }
}

/// `PageSource` backed by a real HTTP client and an extraction rule
pub struct HttpPageSource {
    client: Client,
    selectors: ChapterSelectors,
    timeout: Duration,
}

impl HttpPageSource {
    /// Creates a page source, compiling the rule's chapter selectors once
    pub fn new(client: Client, rule: &ExtractionRule, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            selectors: ChapterSelectors::compile(&rule.chapter)?,
            timeout,
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_and_extract(&self, url: &Url) -> Result<ExtractedPage, NovelError> {
        tracing::trace!("Fetching page {}", url);
        let body = fetch_page(&self.client, url.as_str(), self.timeout).await?;
        extract_page(&body, &self.selectors, url.as_str())
    }
}
