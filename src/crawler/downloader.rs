//! Retrying chapter downloader
//!
//! Wraps the content assembler with the configured retry policy. Whatever
//! happens on the network, `download` returns a terminal outcome: either the
//! converted chapter or a failure record that has been written to the book's
//! failure log.

use crate::config::RetryPolicy;
use crate::crawler::assembler::ContentAssembler;
use crate::model::{BookMeta, Chapter, ChapterOutcome, FailureRecord};
use crate::output::{ChapterConverter, FailureLog};
use crate::NovelError;
use std::sync::Arc;

/// Downloads chapters with bounded retries and per-attempt pacing
pub struct ChapterDownloader {
    assembler: ContentAssembler,
    policy: RetryPolicy,
    converter: Arc<dyn ChapterConverter>,
    ext_name: String,
}

impl ChapterDownloader {
    pub fn new(
        assembler: ContentAssembler,
        policy: RetryPolicy,
        converter: Arc<dyn ChapterConverter>,
        ext_name: impl Into<String>,
    ) -> Self {
        Self {
            assembler,
            policy,
            converter,
            ext_name: ext_name.into(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Downloads one chapter, retrying up to `max_attempts` times
    ///
    /// # Retry Protocol
    ///
    /// | Attempt | Pacing between pages | Logging |
    /// |---------|----------------------|---------|
    /// | 1 | normal interval | info |
    /// | 2..=max | retry interval | warn naming the attempt before the try |
    ///
    /// Every failed attempt is logged with its reason. When the last attempt
    /// fails, a [`FailureRecord`] carrying the last error is appended to
    /// `failure_log` and returned; errors never escape this function.
    pub async fn download(
        &self,
        book: &BookMeta,
        mut chapter: Chapter,
        failure_log: &FailureLog,
    ) -> ChapterOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error: Option<NovelError> = None;

        tracing::info!("Downloading 【{}】", chapter.title);

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tracing::warn!(
                    "Retrying 【{}】, attempt {}/{}",
                    chapter.title,
                    attempt,
                    max_attempts
                );
            }

            let interval = self.policy.interval_for(attempt);
            match self.assembler.assemble(&chapter.url, interval).await {
                Ok(content) => {
                    if attempt > 1 {
                        tracing::info!("Retry succeeded for 【{}】", chapter.title);
                    }
                    chapter.content = Some(content);
                    return ChapterOutcome::Downloaded(self.converter.convert(chapter, &self.ext_name));
                }
                Err(e) => {
                    tracing::warn!(
                        "Attempt {}/{} failed for 【{}】: {}",
                        attempt,
                        max_attempts,
                        chapter.title,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());

        let exhausted = NovelError::ExhaustedRetries {
            url: chapter.url.clone(),
            attempts: max_attempts,
            last_error: reason.clone(),
        };
        tracing::error!("【{}】 failed permanently: {}", chapter.title, exhausted);

        let record = FailureRecord::new(&chapter, book, reason);
        if let Err(e) = failure_log.append(&record).await {
            tracing::error!(
                "Failed to write failure log {}: {}",
                failure_log.path().display(),
                e
            );
        }

        ChapterOutcome::Failed {
            order: chapter.order,
            record,
        }
    }
}
