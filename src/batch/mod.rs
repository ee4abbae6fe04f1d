//! Batch download of several books
//!
//! This module handles:
//! - Parsing the batch list (`book-name author` per line, `#` terminator)
//! - Resolving each entry against the source's catalog
//! - Crawling found books strictly one after another
//! - Aggregating per-book reports and total time

mod search;
mod toc;

pub use search::{parse_search_results, RuleCatalog};
pub use toc::{parse_toc, RuleToc};

use crate::crawler::BookCrawler;
use crate::model::{BookMeta, BookReport, Chapter};
use crate::output::{write_not_found_log, BookSink};
use crate::NovelError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Finds catalog entries for a book name
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, book_name: &str) -> Result<Vec<BookMeta>, NovelError>;
}

/// Lists the chapters of a catalog entry in reading order
#[async_trait]
pub trait TocSource: Send + Sync {
    async fn chapters(&self, book: &BookMeta) -> Result<Vec<Chapter>, NovelError>;
}

/// One requested book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub book_name: String,
    pub author: String,
}

/// Parses a batch list
///
/// One `book-name author` pair per line, separated by whitespace. Blank
/// lines are ignored, a line holding only `#` ends the list, and lines
/// without an author are skipped with a warning.
///
/// # Example
///
/// ```
/// use novel_ripple::batch::parse_batch_list;
///
/// let entries = parse_batch_list("斗破苍穹 天蚕土豆\n\n遮天 辰东\n#\n忽略 的行\n");
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[1].author, "辰东");
/// ```
pub fn parse_batch_list(input: &str) -> Vec<BatchEntry> {
    let mut entries = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line == "#" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(book_name), Some(author)) => entries.push(BatchEntry {
                book_name: book_name.to_string(),
                author: author.to_string(),
            }),
            _ => tracing::warn!("Skipping batch line without an author: {}", line),
        }
    }

    entries
}

/// Result of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Number of entries in the batch list
    pub requested: usize,

    /// Entries the catalog did not contain
    pub not_found: Vec<BatchEntry>,

    /// Found books that could not be crawled, with the reason
    pub skipped: Vec<(BookMeta, String)>,

    /// Reports of crawled books, in batch order
    pub books: Vec<BookReport>,

    /// Sum of the books' crawl times
    pub total_elapsed_seconds: f64,

    /// Where the not-found list was written, if any book was missing
    pub not_found_log: Option<PathBuf>,
}

impl BatchReport {
    pub fn found(&self) -> usize {
        self.requested - self.not_found.len()
    }

    pub fn total_succeeded(&self) -> usize {
        self.books.iter().map(|b| b.result.succeeded.len()).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.books.iter().map(|b| b.result.failed.len()).sum()
    }
}

/// Downloads a list of books one after another
///
/// Books are never crawled concurrently: a single book already uses the
/// whole chapter concurrency budget against the source site.
pub struct BatchOrchestrator {
    catalog: Arc<dyn CatalogSearch>,
    toc: Arc<dyn TocSource>,
    crawler: BookCrawler,
    sink: Arc<dyn BookSink>,
    source_id: u32,
}

impl BatchOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogSearch>,
        toc: Arc<dyn TocSource>,
        crawler: BookCrawler,
        sink: Arc<dyn BookSink>,
        source_id: u32,
    ) -> Self {
        Self {
            catalog,
            toc,
            crawler,
            sink,
            source_id,
        }
    }

    /// Resolves, crawls and writes every entry of the batch
    ///
    /// # Flow
    ///
    /// 1. Search the catalog for each entry; keep the result whose name and
    ///    author both match exactly
    /// 2. Stop if no entry was found; otherwise write the not-found list
    ///    (if any) to the download directory
    /// 3. For each found book, in order: fetch its TOC, crawl it, write it
    ///
    /// A book whose TOC cannot be fetched is skipped; a book whose file
    /// cannot be written keeps its crawl report. Either way it is listed in
    /// `skipped` and the batch moves on.
    pub async fn run(&self, entries: &[BatchEntry]) -> BatchReport {
        let mut report = BatchReport {
            requested: entries.len(),
            ..BatchReport::default()
        };

        let found = self.resolve(entries, &mut report).await;

        tracing::info!(
            "{} book(s) requested, {} found, {} not found",
            report.requested,
            found.len(),
            report.not_found.len()
        );

        // Nothing to switch sources for: the whole list can be retried as-is
        if found.is_empty() {
            return report;
        }

        if !report.not_found.is_empty() {
            let missing: Vec<(String, String)> = report
                .not_found
                .iter()
                .map(|e| (e.book_name.clone(), e.author.clone()))
                .collect();
            match write_not_found_log(self.crawler.download_dir(), self.source_id, &missing).await {
                Ok(path) => report.not_found_log = Some(path),
                Err(e) => tracing::error!("Failed to write not-found list: {}", e),
            }
        }

        for book in found {
            tracing::info!(
                "{} START 《{}》({}) {}",
                DIVIDER,
                book.book_name,
                book.author,
                DIVIDER
            );

            match self.table_of_contents(&book).await {
                Ok(chapters) => {
                    let book_report = self.crawler.crawl(&book, chapters).await;
                    if let Err(e) = self.sink.write(&book_report).await {
                        tracing::error!("Failed to write 《{}》: {}", book.book_name, e);
                        report
                            .skipped
                            .push((book.clone(), format!("could not write book: {}", e)));
                    }
                    report.total_elapsed_seconds += book_report.result.elapsed_seconds;
                    report.books.push(book_report);
                }
                Err(e) => {
                    tracing::error!("Skipping 《{}》: {}", book.book_name, e);
                    report.skipped.push((book.clone(), e.to_string()));
                }
            }

            tracing::info!(
                "{} END 《{}》({}) {}",
                DIVIDER,
                book.book_name,
                book.author,
                DIVIDER
            );
        }

        report
    }

    async fn resolve(&self, entries: &[BatchEntry], report: &mut BatchReport) -> Vec<BookMeta> {
        let mut found = Vec::new();

        for entry in entries {
            let candidates = match self.catalog.search(&entry.book_name).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!("Search failed for 《{}》: {}", entry.book_name, e);
                    Vec::new()
                }
            };

            match candidates
                .into_iter()
                .find(|c| c.book_name == entry.book_name && c.author == entry.author)
            {
                Some(book) => {
                    tracing::info!("Found 《{}》({}) {}", book.book_name, book.author, book.url);
                    found.push(book);
                }
                None => {
                    tracing::info!("Not found: 《{}》({})", entry.book_name, entry.author);
                    report.not_found.push(entry.clone());
                }
            }
        }

        found
    }

    async fn table_of_contents(&self, book: &BookMeta) -> Result<Vec<Chapter>, NovelError> {
        let chapters = self.toc.chapters(book).await?;
        if chapters.is_empty() {
            return Err(NovelError::Collaborator(format!(
                "table of contents at {} lists no chapters",
                book.url
            )));
        }
        Ok(chapters)
    }
}

const DIVIDER: &str = "==========";
