use crate::config::types::{Config, CrawlConfig, ExtractionRule, OutputConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    validate_rule(&config.rule)?;

    if config.client.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry, pacing and concurrency settings
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retry-attempts must be >= 1, got {}",
            config.max_retry_attempts
        )));
    }

    if config.min_interval > config.max_interval {
        return Err(ConfigError::Validation(format!(
            "min-interval ({}ms) must not exceed max-interval ({}ms)",
            config.min_interval, config.max_interval
        )));
    }

    if config.retry_min_interval > config.retry_max_interval {
        return Err(ConfigError::Validation(format!(
            "retry-min-interval ({}ms) must not exceed retry-max-interval ({}ms)",
            config.retry_min_interval, config.retry_max_interval
        )));
    }

    // Retries back off at least as much as the first attempt
    if config.retry_min_interval < config.min_interval
        || config.retry_max_interval < config.max_interval
    {
        return Err(ConfigError::Validation(format!(
            "retry intervals ({}-{}ms) must be >= normal intervals ({}-{}ms)",
            config.retry_min_interval,
            config.retry_max_interval,
            config.min_interval,
            config.max_interval
        )));
    }

    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.max_concurrent_chapters < 1 || config.max_concurrent_chapters > 256 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-chapters must be between 1 and 256, got {}",
            config.max_concurrent_chapters
        )));
    }

    if config.max_pages_per_chapter < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages-per-chapter must be >= 1, got {}",
            config.max_pages_per_chapter
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.download_path.is_empty() {
        return Err(ConfigError::Validation(
            "download-path cannot be empty".to_string(),
        ));
    }

    if config.ext_name.is_empty() || !config.ext_name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(format!(
            "ext-name must be a non-empty alphanumeric extension, got '{}'",
            config.ext_name
        )));
    }

    Ok(())
}

/// Validates the extraction rule: base URL and every selector must parse
fn validate_rule(rule: &ExtractionRule) -> Result<(), ConfigError> {
    let base = Url::parse(&rule.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid rule url '{}': {}", rule.url, e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Rule url '{}' must use HTTP or HTTPS",
            rule.url
        )));
    }

    validate_selector("chapter.content", &rule.chapter.content)?;

    match &rule.chapter.next_page {
        Some(next_page) => validate_selector("chapter.next-page", next_page)?,
        None if rule.chapter.pagination => {
            return Err(ConfigError::Validation(
                "chapter.next-page is required when pagination is enabled".to_string(),
            ));
        }
        None => {}
    }

    if let Some(toc) = &rule.toc {
        validate_selector("toc.item", &toc.item)?;
    }

    if let Some(search) = &rule.search {
        if !search.url.contains("%s") {
            return Err(ConfigError::Validation(format!(
                "search.url must contain a %s placeholder, got '{}'",
                search.url
            )));
        }
        validate_selector("search.result", &search.result)?;
        validate_selector("search.book-name", &search.book_name)?;
        validate_selector("search.author", &search.author)?;
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!("{} cannot be empty", name)));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}
