//! Console summaries of book and batch crawls
//!
//! This module prints what an operator needs after each book: timing,
//! success counts and the chapters that need reprocessing.

use crate::batch::BatchReport;
use crate::model::BookReport;
use chrono::Duration;

/// Formats a duration in seconds for humans
///
/// # Example
///
/// ```
/// use novel_ripple::output::format_duration;
///
/// assert_eq!(format_duration(12.345), "12.35s");
/// assert_eq!(format_duration(3725.0), "1h 2m 5s");
/// ```
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{:.2}s", seconds.max(0.0));
    }

    let duration = Duration::milliseconds((seconds * 1000.0).round() as i64);
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    let secs = duration.num_seconds() % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else {
        format!("{}m {}s", minutes, secs)
    }
}

/// Prints the result of one book crawl
pub fn print_crawl_result(report: &BookReport) {
    let result = &report.result;

    println!(
        "《{}》({}): {}/{} chapters downloaded in {}",
        report.book.book_name,
        report.book.author,
        result.succeeded.len(),
        result.total(),
        format_duration(result.elapsed_seconds)
    );

    if !report.failures.is_empty() {
        println!("  Failed chapters ({}):", report.failures.len());
        for record in &report.failures {
            println!("    - {} ({}): {}", record.chapter_title, record.chapter_url, record.reason);
        }
    }
}

/// Prints the totals of a batch run
pub fn print_batch_summary(report: &BatchReport) {
    println!("=== Batch Summary ===\n");
    println!("  Requested: {}", report.requested);
    println!("  Found:     {}", report.found());
    println!("  Not found: {}", report.not_found.len());
    for entry in &report.not_found {
        println!("    - {} {}", entry.book_name, entry.author);
    }

    if !report.skipped.is_empty() {
        println!("  Skipped:   {}", report.skipped.len());
        for (book, reason) in &report.skipped {
            println!("    - 《{}》({}): {}", book.book_name, book.author, reason);
        }
    }

    println!();
    for book in &report.books {
        print_crawl_result(book);
    }

    println!(
        "\nChapters: {} succeeded, {} failed",
        report.total_succeeded(),
        report.total_failed()
    );
    println!(
        "Total crawl time: {}",
        format_duration(report.total_elapsed_seconds)
    );
}
