//! Book crawl coordinator
//!
//! This module fans a book's chapters out to concurrent download tasks and
//! gathers their outcomes:
//! - One tokio task per chapter, bounded by a semaphore
//! - A completion barrier the coordinator waits on
//! - Aggregation of succeeded and failed chapter orders
//! - Wall-clock timing of the whole fan-out

use crate::config::Config;
use crate::crawler::assembler::ContentAssembler;
use crate::crawler::barrier::CompletionBarrier;
use crate::crawler::downloader::ChapterDownloader;
use crate::crawler::fetcher::{build_http_client, HttpPageSource, PageSource};
use crate::crawler::pacing::{Pacer, RandomPacer};
use crate::model::{BookMeta, BookReport, Chapter, ChapterOutcome, CrawlResult, FailureRecord};
use crate::output::{ChapterConverter, FailureLog, FormatConverter};
use crate::NovelError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};

/// Crawls all chapters of a book concurrently
pub struct BookCrawler {
    downloader: Arc<ChapterDownloader>,
    max_concurrent: usize,
    download_dir: PathBuf,
}

impl BookCrawler {
    /// Creates a crawler around an existing downloader
    ///
    /// # Arguments
    ///
    /// * `downloader` - The retrying chapter downloader shared by all tasks
    /// * `max_concurrent` - Maximum number of chapters in flight at once
    /// * `download_dir` - Directory receiving the per-book failure logs
    pub fn new(
        downloader: ChapterDownloader,
        max_concurrent: usize,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader: Arc::new(downloader),
            max_concurrent: max_concurrent.max(1),
            download_dir: download_dir.into(),
        }
    }

    /// Builds the full HTTP-backed crawler described by the configuration
    pub fn from_config(config: &Config) -> Result<Self, NovelError> {
        let client = build_http_client(&config.client, config.crawl.timeout())?;
        let source: Arc<dyn PageSource> = Arc::new(HttpPageSource::new(
            client,
            &config.rule,
            config.crawl.timeout(),
        )?);
        let pacer: Arc<dyn Pacer> = Arc::new(RandomPacer);
        let converter: Arc<dyn ChapterConverter> = Arc::new(FormatConverter);

        let assembler = ContentAssembler::new(
            source,
            pacer,
            &config.rule,
            config.crawl.max_pages_per_chapter,
        )?;
        let downloader = ChapterDownloader::new(
            assembler,
            config.crawl.retry_policy(),
            converter,
            config.output.ext_name.clone(),
        );

        Ok(Self::new(
            downloader,
            config.crawl.max_concurrent_chapters as usize,
            &config.output.download_path,
        ))
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Path of the failure log written for `book`
    pub fn failure_log_path(&self, book: &BookMeta) -> PathBuf {
        FailureLog::for_book(&self.download_dir, book).path().to_path_buf()
    }

    /// Downloads every chapter of `book`
    ///
    /// Each chapter is moved into its own task, which owns it until it
    /// reports a terminal outcome. A failed chapter never cancels its
    /// siblings. The coordinator waits on a completion barrier sized to the
    /// chapter count; every task signals it exactly once, including tasks
    /// that fail permanently or panic.
    ///
    /// The returned report lists successful chapters sorted by `order`.
    pub async fn crawl(&self, book: &BookMeta, chapters: Vec<Chapter>) -> BookReport {
        let start = Instant::now();
        let total = chapters.len();
        tracing::info!(
            "Crawling 《{}》({}): {} chapters, up to {} at a time",
            book.book_name,
            book.author,
            total,
            self.max_concurrent
        );

        // Kept to account for tasks that die without reporting
        let stubs: BTreeMap<u32, Chapter> = chapters
            .iter()
            .map(|chapter| (chapter.order, chapter.clone()))
            .collect();

        let barrier = CompletionBarrier::new(total);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let failure_log = Arc::new(FailureLog::for_book(&self.download_dir, book));
        let shared_book = Arc::new(book.clone());
        let (tx, mut rx) = mpsc::unbounded_channel::<ChapterOutcome>();

        for chapter in chapters {
            let token = barrier.token();
            let semaphore = Arc::clone(&semaphore);
            let downloader = Arc::clone(&self.downloader);
            let failure_log = Arc::clone(&failure_log);
            let book = Arc::clone(&shared_book);
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = downloader.download(&book, chapter, &failure_log).await;
                if tx.send(outcome).is_err() {
                    tracing::debug!("Crawl result receiver dropped");
                }
                token.signal_done();
            });
        }
        drop(tx);

        barrier.wait().await;
        let elapsed_seconds = start.elapsed().as_secs_f64();

        let mut outcomes = Vec::with_capacity(total);
        while let Ok(outcome) = rx.try_recv() {
            outcomes.push(outcome);
        }

        let report = self
            .aggregate(book, stubs, outcomes, elapsed_seconds, &failure_log)
            .await;

        tracing::info!(
            "Finished 《{}》: {} succeeded, {} failed in {:.2}s",
            book.book_name,
            report.result.succeeded.len(),
            report.result.failed.len(),
            elapsed_seconds
        );
        if !report.failures.is_empty() {
            tracing::warn!(
                "{} chapter(s) failed permanently, see {}",
                report.failures.len(),
                failure_log.path().display()
            );
        }

        report
    }

    async fn aggregate(
        &self,
        book: &BookMeta,
        mut stubs: BTreeMap<u32, Chapter>,
        outcomes: Vec<ChapterOutcome>,
        elapsed_seconds: f64,
        failure_log: &FailureLog,
    ) -> BookReport {
        let mut result = CrawlResult {
            elapsed_seconds,
            ..CrawlResult::default()
        };
        let mut chapters = Vec::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            stubs.remove(&outcome.order());
            match outcome {
                ChapterOutcome::Downloaded(chapter) => {
                    result.succeeded.insert(chapter.order);
                    chapters.push(chapter);
                }
                ChapterOutcome::Failed { order, record } => {
                    result.failed.insert(order);
                    failures.push((order, record));
                }
            }
        }

        // Chapters whose task ended without an outcome (panic) still need a record
        for (order, chapter) in stubs {
            tracing::error!("Download task for 【{}】 ended without a result", chapter.title);
            let record = FailureRecord::new(&chapter, book, "download task aborted");
            if let Err(e) = failure_log.append(&record).await {
                tracing::error!(
                    "Failed to write failure log {}: {}",
                    failure_log.path().display(),
                    e
                );
            }
            result.failed.insert(order);
            failures.push((order, record));
        }

        chapters.sort_by_key(|chapter| chapter.order);
        failures.sort_by_key(|(order, _)| *order);

        BookReport {
            book: book.clone(),
            result,
            chapters,
            failures: failures.into_iter().map(|(_, record)| record).collect(),
        }
    }
}
