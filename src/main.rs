//! Novel-Ripple main entry point
//!
//! This is the command-line interface for the Novel-Ripple chapter crawler.

use anyhow::Context;
use clap::Parser;
use novel_ripple::batch::{parse_batch_list, BatchEntry, BatchOrchestrator, RuleCatalog, RuleToc};
use novel_ripple::config::{load_config_with_hash, Config};
use novel_ripple::crawler::{build_http_client, BookCrawler};
use novel_ripple::output::{print_batch_summary, BookWriter};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Novel-Ripple: a rule-driven novel chapter crawler
///
/// Novel-Ripple searches a source site for each book of a batch list,
/// downloads its chapters concurrently with randomized pacing and bounded
/// retries, and writes one file per book. Chapters that fail every attempt
/// are listed in a per-book failure log next to the book.
#[derive(Parser, Debug)]
#[command(name = "novel-ripple")]
#[command(version)]
#[command(about = "A rule-driven novel chapter crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Batch list, one `book-name author` pair per line (reads stdin if omitted)
    #[arg(value_name = "BATCH")]
    batch: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be downloaded without downloading
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let entries = read_batch(cli.batch.as_ref())?;
    if entries.is_empty() {
        anyhow::bail!("Batch list is empty");
    }

    if cli.dry_run {
        handle_dry_run(&config, &entries);
        return Ok(());
    }

    handle_batch(config, entries).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("novel_ripple=info,warn"),
            1 => EnvFilter::new("novel_ripple=debug,info"),
            2 => EnvFilter::new("novel_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn read_batch(path: Option<&PathBuf>) -> anyhow::Result<Vec<BatchEntry>> {
    let input = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch list {}", path.display()))?,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read batch list from stdin")?;
            input
        }
    };
    Ok(parse_batch_list(&input))
}

/// Handles the --dry-run mode: shows the settings and the parsed batch
fn handle_dry_run(config: &Config, entries: &[BatchEntry]) {
    println!("=== Novel-Ripple Dry Run ===\n");

    println!("Source: {} ({})", config.source_id, config.rule.url);

    println!("\nCrawl:");
    println!(
        "  Max concurrent chapters: {}",
        config.crawl.max_concurrent_chapters
    );
    println!("  Max retry attempts: {}", config.crawl.max_retry_attempts);
    println!(
        "  Interval: {}-{}ms (retry {}-{}ms)",
        config.crawl.min_interval,
        config.crawl.max_interval,
        config.crawl.retry_min_interval,
        config.crawl.retry_max_interval
    );
    println!("  Page timeout: {}ms", config.crawl.timeout_ms);
    println!("  Max pages per chapter: {}", config.crawl.max_pages_per_chapter);
    println!("  Pagination: {}", config.rule.chapter.pagination);

    println!("\nOutput:");
    println!("  Download path: {}", config.output.download_path);
    println!("  Format: {}", config.output.ext_name);

    println!("\nBooks ({}):", entries.len());
    for entry in entries {
        println!("  - {} {}", entry.book_name, entry.author);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main batch download
async fn handle_batch(config: Config, entries: Vec<BatchEntry>) -> anyhow::Result<()> {
    let timeout = config.crawl.timeout();
    let client = build_http_client(&config.client, timeout).context("Failed to build HTTP client")?;

    let catalog = RuleCatalog::new(client.clone(), &config.rule, timeout)?;
    let toc = RuleToc::new(client, &config.rule, timeout)?;
    let crawler = BookCrawler::from_config(&config)?;
    let writer = BookWriter::new(&config.output.download_path, config.output.ext_name.clone());

    let orchestrator = BatchOrchestrator::new(
        Arc::new(catalog),
        Arc::new(toc),
        crawler,
        Arc::new(writer),
        config.source_id,
    );

    let report = orchestrator.run(&entries).await;
    print_batch_summary(&report);

    if let Some(path) = &report.not_found_log {
        println!("Books not found were listed in {}", path.display());
    }

    Ok(())
}
