//! Output module for everything a crawl leaves behind
//!
//! This module handles:
//! - Converting downloaded chapters into the output format
//! - Writing finished books in chapter order
//! - Appending permanently failed chapters to per-book logs
//! - Recording books the catalog could not find
//! - Printing crawl and batch summaries

mod book_writer;
mod convert;
mod failure_log;
pub mod stats;

pub use book_writer::{book_file_name, BookSink, BookWriter};
pub use convert::{html_to_text, ChapterConverter, FormatConverter};
pub use failure_log::{failure_log_file_name, FailureLog};
pub use stats::{format_duration, print_batch_summary, print_crawl_result};

use std::path::{Path, PathBuf};

/// Replaces characters that are not allowed in file names
///
/// # Example
///
/// ```
/// use novel_ripple::output::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("A/B: C?"), "A_B_ C_");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// `批量下载 - 书源 {source_id} 未搜到的书.log`
pub fn not_found_log_path(download_dir: &Path, source_id: u32) -> PathBuf {
    download_dir.join(format!("批量下载 - 书源 {} 未搜到的书.log", source_id))
}

/// Writes the list of books the catalog could not find
///
/// The file uses the batch input format (`book-name author` per line, `#`
/// terminator) so it can be fed back after switching to another source.
/// An existing list for the same source is replaced.
pub async fn write_not_found_log(
    download_dir: &Path,
    source_id: u32,
    books: &[(String, String)],
) -> std::io::Result<PathBuf> {
    let mut content = String::new();
    for (book_name, author) in books {
        content.push_str(&format!("{} {}\n", book_name, author));
    }
    content.push_str("#\n");
    content.push_str("To retry these books, switch to another source and pass this file as the batch list.\n");

    tokio::fs::create_dir_all(download_dir).await?;
    let path = not_found_log_path(download_dir, source_id);
    tokio::fs::write(&path, content).await?;
    Ok(path)
}
