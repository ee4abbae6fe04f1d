//! Configuration module for Novel-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files:
//! the book source's extraction rule, the retry policy and the output settings.
//!
//! # Example
//!
//! ```no_run
//! use novel_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Chapters will be retried {} times", config.crawl.max_retry_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ChapterRule, ClientConfig, Config, CrawlConfig, ExtractionRule, Interval, OutputConfig,
    RetryPolicy, SearchRule, TocRule,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
