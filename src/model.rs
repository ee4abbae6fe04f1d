//! Data model shared by the crawler, the batch orchestrator and the writers

use std::collections::BTreeSet;

/// One ordered unit of a book's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,

    /// Entry URL of the chapter (first page when paginated)
    pub url: String,

    /// Position of the chapter in the finished book
    pub order: u32,

    /// Populated exactly once by a successful download
    pub content: Option<String>,
}

impl Chapter {
    /// Creates a chapter stub as produced by table-of-contents discovery
    pub fn new(title: impl Into<String>, url: impl Into<String>, order: u32) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            order,
            content: None,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// A catalog entry resolved from a book name and author
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMeta {
    pub book_name: String,
    pub author: String,

    /// URL of the book's table of contents
    pub url: String,
}

impl BookMeta {
    pub fn new(
        book_name: impl Into<String>,
        author: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            book_name: book_name.into(),
            author: author.into(),
            url: url.into(),
        }
    }
}

/// Durable record of a chapter that failed every attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub chapter_title: String,
    pub chapter_url: String,
    pub reason: String,
    pub book_name: String,
    pub author: String,
}

impl FailureRecord {
    pub fn new(chapter: &Chapter, book: &BookMeta, reason: impl Into<String>) -> Self {
        Self {
            chapter_title: chapter.title.clone(),
            chapter_url: chapter.url.clone(),
            reason: reason.into(),
            book_name: book.book_name.clone(),
            author: book.author.clone(),
        }
    }

    /// The line appended to the book's failure log (without the newline)
    pub fn log_line(&self) -> String {
        format!(
            "下载失败章节：【{}】({})，原因：{}",
            self.chapter_title,
            self.chapter_url,
            // Keep one record per line even when the error text spans several
            self.reason.replace(['\r', '\n'], " ")
        )
    }
}

/// Terminal outcome of one chapter download
#[derive(Debug, Clone)]
pub enum ChapterOutcome {
    /// Content was assembled and converted
    Downloaded(Chapter),

    /// Every attempt failed; the record has been written to the failure log
    Failed { order: u32, record: FailureRecord },
}

impl ChapterOutcome {
    pub fn order(&self) -> u32 {
        match self {
            Self::Downloaded(chapter) => chapter.order,
            Self::Failed { order, .. } => *order,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded(_))
    }
}

/// Aggregate result of one book crawl
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlResult {
    /// Wall-clock duration of the whole fan-out
    pub elapsed_seconds: f64,

    /// Orders of chapters downloaded successfully
    pub succeeded: BTreeSet<u32>,

    /// Orders of chapters that failed every attempt
    pub failed: BTreeSet<u32>,
}

impl CrawlResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Everything a book crawl produces, handed to the writer
#[derive(Debug, Clone)]
pub struct BookReport {
    pub book: BookMeta,
    pub result: CrawlResult,

    /// Successfully downloaded chapters, sorted by `order`
    pub chapters: Vec<Chapter>,

    /// Failure records, sorted by chapter order
    pub failures: Vec<FailureRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> BookMeta {
        BookMeta::new("斗破苍穹", "天蚕土豆", "https://example.com/book/1/")
    }

    #[test]
    fn test_chapter_stub_is_not_downloaded() {
        let mut chapter = Chapter::new("第一章", "https://example.com/1.html", 1);
        assert!(!chapter.is_downloaded());

        chapter.content = Some(String::new());
        assert!(!chapter.is_downloaded());

        chapter.content = Some("<p>text</p>".to_string());
        assert!(chapter.is_downloaded());
    }

    #[test]
    fn test_failure_log_line_format() {
        let chapter = Chapter::new("第七章", "https://example.com/7.html", 7);
        let record = FailureRecord::new(&chapter, &book(), "HTTP status 500");

        assert_eq!(
            record.log_line(),
            "下载失败章节：【第七章】(https://example.com/7.html)，原因：HTTP status 500"
        );
    }

    #[test]
    fn test_failure_log_line_is_single_line() {
        let chapter = Chapter::new("第七章", "https://example.com/7.html", 7);
        let record = FailureRecord::new(&chapter, &book(), "first\nsecond");

        assert!(!record.log_line().contains('\n'));
    }

    #[test]
    fn test_outcome_order() {
        let chapter = Chapter::new("第三章", "https://example.com/3.html", 3);
        let record = FailureRecord::new(&chapter, &book(), "boom");

        assert_eq!(ChapterOutcome::Downloaded(chapter).order(), 3);
        assert_eq!(ChapterOutcome::Failed { order: 3, record }.order(), 3);
    }
}
