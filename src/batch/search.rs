//! Catalog search driven by the source's search rule

use crate::batch::CatalogSearch;
use crate::config::{ExtractionRule, SearchRule};
use crate::crawler::{compile_selector, element_text, fetch_page};
use crate::model::BookMeta;
use crate::url::resolve_link;
use crate::{ConfigError, NovelError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Compiled search selectors
#[derive(Debug, Clone)]
struct SearchSelectors {
    result: Selector,
    book_name: Selector,
    author: Selector,
}

impl SearchSelectors {
    fn compile(rule: &SearchRule) -> Result<Self, ConfigError> {
        Ok(Self {
            result: compile_selector(&rule.result)?,
            book_name: compile_selector(&rule.book_name)?,
            author: compile_selector(&rule.author)?,
        })
    }
}

/// Searches the source site's catalog over HTTP
pub struct RuleCatalog {
    client: Client,
    url_template: String,
    selectors: SearchSelectors,
    base_url: Url,
    timeout: Duration,
}

impl RuleCatalog {
    /// Creates a catalog search; fails if the rule has no `[rule.search]` section
    pub fn new(client: Client, rule: &ExtractionRule, timeout: Duration) -> Result<Self, ConfigError> {
        let search = rule.search.as_ref().ok_or_else(|| {
            ConfigError::Validation("rule has no [rule.search] section".to_string())
        })?;
        let base_url = Url::parse(&rule.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid rule url '{}': {}", rule.url, e)))?;

        Ok(Self {
            client,
            url_template: search.url.clone(),
            selectors: SearchSelectors::compile(search)?,
            base_url,
            timeout,
        })
    }

    fn search_url(&self, book_name: &str) -> String {
        let encoded: String = byte_serialize(book_name.as_bytes()).collect();
        self.url_template.replace("%s", &encoded)
    }
}

#[async_trait]
impl CatalogSearch for RuleCatalog {
    async fn search(&self, book_name: &str) -> Result<Vec<BookMeta>, NovelError> {
        let url = self.search_url(book_name);
        tracing::debug!("Searching catalog: {}", url);

        let body = fetch_page(&self.client, &url, self.timeout).await?;
        Ok(parse_results(&body, &self.selectors, &self.base_url))
    }
}

/// Parses a search result page with the given rule
pub fn parse_search_results(
    html: &str,
    rule: &SearchRule,
    base_url: &Url,
) -> Result<Vec<BookMeta>, ConfigError> {
    let selectors = SearchSelectors::compile(rule)?;
    Ok(parse_results(html, &selectors, base_url))
}

fn parse_results(html: &str, selectors: &SearchSelectors, base_url: &Url) -> Vec<BookMeta> {
    let document = Html::parse_document(html);

    document
        .select(&selectors.result)
        .filter_map(|row| {
            let name_el = row.select(&selectors.book_name).next()?;
            let book_name = element_text(&name_el);
            let author = row
                .select(&selectors.author)
                .next()
                .map(|el| element_text(&el))?;
            let href = name_el.value().attr("href")?;
            let url = resolve_link(href, base_url).ok()?;

            if book_name.is_empty() || author.is_empty() {
                return None;
            }

            Some(BookMeta::new(book_name, author, url.to_string()))
        })
        .collect()
}
