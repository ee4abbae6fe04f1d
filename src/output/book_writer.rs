//! Finished book writer
//!
//! Chapters finish downloading in any order; the writer is where reading
//! order is restored, using each chapter's `order`.

use crate::model::{BookMeta, BookReport, Chapter};
use crate::output::sanitize_file_name;
use crate::NovelError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Persists a crawled book
#[async_trait]
pub trait BookSink: Send + Sync {
    /// Writes the book and returns where it was written
    async fn write(&self, report: &BookReport) -> Result<PathBuf, NovelError>;
}

/// Writes books as a single file per book in the download directory
#[derive(Debug, Clone)]
pub struct BookWriter {
    download_dir: PathBuf,
    ext_name: String,
}

impl BookWriter {
    pub fn new(download_dir: impl Into<PathBuf>, ext_name: impl Into<String>) -> Self {
        Self {
            download_dir: download_dir.into(),
            ext_name: ext_name.into(),
        }
    }

    pub fn book_path(&self, book: &BookMeta) -> PathBuf {
        self.download_dir.join(book_file_name(book, &self.ext_name))
    }

    /// Renders the book body with chapters in reading order
    pub fn render(&self, book: &BookMeta, chapters: &[Chapter]) -> String {
        let mut ordered: Vec<&Chapter> = chapters.iter().collect();
        ordered.sort_by_key(|chapter| chapter.order);

        if self.ext_name.eq_ignore_ascii_case("txt") {
            render_text(book, &ordered)
        } else {
            render_html(book, &ordered)
        }
    }
}

#[async_trait]
impl BookSink for BookWriter {
    async fn write(&self, report: &BookReport) -> Result<PathBuf, NovelError> {
        let path = self.book_path(&report.book);
        let body = self.render(&report.book, &report.chapters);

        ensure_dir(&self.download_dir).await?;
        tokio::fs::write(&path, body).await?;

        tracing::info!(
            "Wrote {} chapter(s) of 《{}》 to {}",
            report.chapters.len(),
            report.book.book_name,
            path.display()
        );
        Ok(path)
    }
}

async fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// `book(author).ext`
pub fn book_file_name(book: &BookMeta, ext_name: &str) -> String {
    sanitize_file_name(&format!("{}({}).{}", book.book_name, book.author, ext_name))
}

fn render_text(book: &BookMeta, chapters: &[&Chapter]) -> String {
    let mut out = format!("{}\n作者：{}\n\n", book.book_name, book.author);
    for chapter in chapters {
        out.push_str(&chapter.title);
        out.push_str("\n\n");
        out.push_str(chapter.content.as_deref().unwrap_or_default());
        out.push_str("\n\n");
    }
    out
}

fn render_html(book: &BookMeta, chapters: &[&Chapter]) -> String {
    let mut out = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n<h1>{}</h1>\n<p>{}</p>\n",
        escape_html(&book.book_name),
        escape_html(&book.book_name),
        escape_html(&book.author)
    );
    for chapter in chapters {
        out.push_str(&format!(
            "<h2 id=\"chapter-{}\">{}</h2>\n",
            chapter.order,
            escape_html(&chapter.title)
        ));
        out.push_str(chapter.content.as_deref().unwrap_or_default());
        out.push('\n');
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
