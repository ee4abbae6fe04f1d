use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Novel-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identifier of the book source the rule describes
    #[serde(rename = "source-id")]
    pub source_id: u32,

    pub crawl: CrawlConfig,

    #[serde(default)]
    pub client: ClientConfig,

    pub output: OutputConfig,

    pub rule: ExtractionRule,
}

/// Crawl pacing, retry and concurrency configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Maximum number of attempts per chapter (first try included)
    #[serde(rename = "max-retry-attempts")]
    pub max_retry_attempts: u32,

    /// Lower bound of the pause between pages on a first attempt (milliseconds)
    #[serde(rename = "min-interval")]
    pub min_interval: u64,

    /// Upper bound of the pause between pages on a first attempt (milliseconds)
    #[serde(rename = "max-interval")]
    pub max_interval: u64,

    /// Lower bound of the pause between pages on a retry (milliseconds)
    #[serde(rename = "retry-min-interval")]
    pub retry_min_interval: u64,

    /// Upper bound of the pause between pages on a retry (milliseconds)
    #[serde(rename = "retry-max-interval")]
    pub retry_max_interval: u64,

    /// Timeout for a single page fetch (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of chapters downloaded at the same time
    #[serde(rename = "max-concurrent-chapters", default = "default_max_concurrent_chapters")]
    pub max_concurrent_chapters: u32,

    /// Safety cap on the number of pages a single chapter may span
    #[serde(rename = "max-pages-per-chapter", default = "default_max_pages_per_chapter")]
    pub max_pages_per_chapter: u32,
}

impl CrawlConfig {
    /// Builds the retry policy described by this section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            normal: Interval::new(self.min_interval, self.max_interval),
            retry: Interval::new(self.retry_min_interval, self.retry_max_interval),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_concurrent_chapters() -> u32 {
    16
}

fn default_max_pages_per_chapter() -> u32 {
    64
}

/// HTTP client identification
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("NovelRipple/{}", env!("CARGO_PKG_VERSION"))
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving books and failure logs
    #[serde(rename = "download-path")]
    pub download_path: String,

    /// Extension (and format) of written books, e.g. "txt" or "html"
    #[serde(rename = "ext-name")]
    pub ext_name: String,
}

/// Site-specific description of where content and navigation live
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRule {
    /// Base URL of the source site, used to resolve relative links
    pub url: String,

    pub chapter: ChapterRule,

    #[serde(default)]
    pub toc: Option<TocRule>,

    #[serde(default)]
    pub search: Option<SearchRule>,
}

/// Chapter page selectors
#[derive(Debug, Clone, Deserialize)]
pub struct ChapterRule {
    /// Selector for the chapter body
    pub content: String,

    /// Selector for the "next page" link
    #[serde(rename = "next-page", default)]
    pub next_page: Option<String>,

    /// Whether chapters are split across several pages
    #[serde(default)]
    pub pagination: bool,

    /// Link text announcing that the next link leads to another chapter
    #[serde(rename = "last-page-marker", default = "default_last_page_marker")]
    pub last_page_marker: String,
}

fn default_last_page_marker() -> String {
    "下一章".to_string()
}

/// Table of contents selectors
#[derive(Debug, Clone, Deserialize)]
pub struct TocRule {
    /// Selector matching one `<a>` per chapter, in reading order
    pub item: String,
}

/// Catalog search selectors
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRule {
    /// Search URL template; `%s` is replaced by the encoded book name
    pub url: String,

    /// Selector matching one element per search result
    pub result: String,

    /// Selector (inside a result) for the book name link
    #[serde(rename = "book-name")]
    pub book_name: String,

    /// Selector (inside a result) for the author
    pub author: String,
}

/// Inclusive range of milliseconds to pause between pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Interval {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

/// Bounded-attempt retry policy with separate pacing for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, at least 1
    pub max_attempts: u32,

    /// Pacing used on the first attempt
    pub normal: Interval,

    /// Pacing used on attempts 2..=max_attempts
    pub retry: Interval,
}

impl RetryPolicy {
    /// Pacing for the given 1-based attempt number
    pub fn interval_for(&self, attempt: u32) -> Interval {
        if attempt <= 1 {
            self.normal
        } else {
            self.retry
        }
    }
}
