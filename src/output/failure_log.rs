//! Per-book log of permanently failed chapters
//!
//! Chapter tasks of one book append to the same file concurrently. All
//! writes go through a single mutex-guarded appender, and each record is
//! written as one complete newline-terminated line, so lines never
//! interleave. The file is opened lazily: a book without failures leaves no
//! log behind.

use crate::model::{BookMeta, FailureRecord};
use crate::output::sanitize_file_name;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only failure log of one book
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FailureLog {
    /// Failure log of `book` inside the download directory
    pub fn for_book(download_dir: &Path, book: &BookMeta) -> Self {
        Self::new(download_dir.join(failure_log_file_name(book)))
    }

    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single line
    pub async fn append(&self, record: &FailureRecord) -> std::io::Result<()> {
        let mut line = record.log_line();
        line.push('\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            *guard = Some(file);
        }

        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
        }

        Ok(())
    }
}

/// `《book》（author）下载失败章节.log`
pub fn failure_log_file_name(book: &BookMeta) -> String {
    sanitize_file_name(&format!(
        "《{}》（{}）下载失败章节.log",
        book.book_name, book.author
    ))
}
