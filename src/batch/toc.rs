//! Table of contents discovery driven by the source's TOC rule

use crate::batch::TocSource;
use crate::config::{ExtractionRule, TocRule};
use crate::crawler::{compile_selector, element_text, fetch_page};
use crate::model::{BookMeta, Chapter};
use crate::url::resolve_link;
use crate::{ConfigError, NovelError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Fetches a book's chapter list over HTTP
pub struct RuleToc {
    client: Client,
    item: Selector,
    base_url: Url,
    timeout: Duration,
}

impl RuleToc {
    /// Creates a TOC source; fails if the rule has no `[rule.toc]` section
    pub fn new(client: Client, rule: &ExtractionRule, timeout: Duration) -> Result<Self, ConfigError> {
        let toc = rule
            .toc
            .as_ref()
            .ok_or_else(|| ConfigError::Validation("rule has no [rule.toc] section".to_string()))?;
        let base_url = Url::parse(&rule.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid rule url '{}': {}", rule.url, e)))?;

        Ok(Self {
            client,
            item: compile_selector(&toc.item)?,
            base_url,
            timeout,
        })
    }
}

#[async_trait]
impl TocSource for RuleToc {
    async fn chapters(&self, book: &BookMeta) -> Result<Vec<Chapter>, NovelError> {
        let body = fetch_page(&self.client, &book.url, self.timeout).await?;
        let chapters = parse_items(&body, &self.item, &self.base_url);
        tracing::info!("《{}》 lists {} chapters", book.book_name, chapters.len());
        Ok(chapters)
    }
}

/// Parses a TOC page with the given rule
///
/// Chapters are numbered from 1 in document order. Items without a usable
/// link are skipped.
pub fn parse_toc(html: &str, rule: &TocRule, base_url: &Url) -> Result<Vec<Chapter>, ConfigError> {
    let item = compile_selector(&rule.item)?;
    Ok(parse_items(html, &item, base_url))
}

fn parse_items(html: &str, item: &Selector, base_url: &Url) -> Vec<Chapter> {
    let document = Html::parse_document(html);

    document
        .select(item)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let url = resolve_link(href, base_url).ok()?;
            Some((element_text(&el), url))
        })
        .zip(1u32..)
        .map(|((title, url), order)| Chapter::new(title, url.to_string(), order))
        .collect()
}
