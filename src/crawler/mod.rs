//! Crawler module for chapter acquisition
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with per-page timeouts
//! - Chapter page parsing and the last-page heuristic
//! - Paginated content assembly with randomized pacing
//! - Bounded per-chapter retries with durable failure records
//! - Concurrent book crawls coordinated by a completion barrier

mod assembler;
mod barrier;
mod coordinator;
mod downloader;
mod fetcher;
mod pacing;
mod parser;

pub use assembler::ContentAssembler;
pub use barrier::{CompletionBarrier, CompletionToken};
pub use coordinator::BookCrawler;
pub use downloader::ChapterDownloader;
pub use fetcher::{build_http_client, fetch_page, HttpPageSource, PageSource};
pub use pacing::{random_delay, Pacer, RandomPacer};
pub use parser::{extract_page, is_last_page, ChapterSelectors, ExtractedPage, NextLink};

pub(crate) use parser::{compile_selector, element_text};

use crate::config::Config;
use crate::model::{BookMeta, BookReport, Chapter};
use crate::NovelError;

/// Crawls one book with an HTTP-backed crawler built from `config`
///
/// This is the main entry point for downloading a single book whose table
/// of contents is already known.
///
/// # Example
///
/// ```no_run
/// use novel_ripple::config::load_config;
/// use novel_ripple::crawler::crawl_book;
/// use novel_ripple::{BookMeta, Chapter};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let book = BookMeta::new("书名", "作者", "https://www.example.com/book/1/");
/// let toc = vec![Chapter::new("第一章", "/book/1/1.html", 1)];
/// let report = crawl_book(&config, &book, toc).await?;
/// println!("{} chapters downloaded", report.chapters.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl_book(
    config: &Config,
    book: &BookMeta,
    chapters: Vec<Chapter>,
) -> Result<BookReport, NovelError> {
    let crawler = BookCrawler::from_config(config)?;
    Ok(crawler.crawl(book, chapters).await)
}
