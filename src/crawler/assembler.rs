//! Paginated chapter assembly
//!
//! A chapter may be split over several pages linked by "next page"
//! navigation. The assembler walks that chain from the chapter's entry URL
//! and concatenates the content of every page.

use crate::config::{ExtractionRule, Interval};
use crate::crawler::fetcher::PageSource;
use crate::crawler::pacing::Pacer;
use crate::crawler::parser::is_last_page;
use crate::url::{normalize_url, resolve_link};
use crate::{ConfigError, NovelError};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Follows a chapter's page chain and concatenates its content
pub struct ContentAssembler {
    source: Arc<dyn PageSource>,
    pacer: Arc<dyn Pacer>,
    base_url: Url,
    pagination: bool,
    last_page_marker: String,
    max_pages: u32,
}

impl ContentAssembler {
    /// Creates an assembler for the given rule
    ///
    /// # Arguments
    ///
    /// * `source` - Fetches and extracts a single page
    /// * `pacer` - Pauses between two pages of the same chapter
    /// * `rule` - The source's extraction rule (base URL, pagination settings)
    /// * `max_pages` - Safety cap on the pages a single chapter may span
    pub fn new(
        source: Arc<dyn PageSource>,
        pacer: Arc<dyn Pacer>,
        rule: &ExtractionRule,
        max_pages: u32,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&rule.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid rule url '{}': {}", rule.url, e)))?;

        Ok(Self {
            source,
            pacer,
            base_url,
            pagination: rule.chapter.pagination,
            last_page_marker: rule.chapter.last_page_marker.clone(),
            max_pages: max_pages.max(1),
        })
    }

    /// Assembles the full content of the chapter starting at `entry_url`
    ///
    /// # Algorithm
    ///
    /// 1. Fetch the page and append its extracted content
    /// 2. Stop if pagination is disabled or the page is the last one
    ///    (see [`is_last_page`])
    /// 3. Resolve the next-page link against the rule's base URL
    /// 4. Pause for a random duration within `interval`, then loop
    ///
    /// The marker heuristic can miss, so a chapter is also stopped when it
    /// reaches `max_pages` pages or links back to a page already visited.
    ///
    /// # Errors
    ///
    /// Any fetch or parse error on any page of the chain fails the whole
    /// chapter; partial content is discarded.
    pub async fn assemble(&self, entry_url: &str, interval: Interval) -> Result<String, NovelError> {
        let mut next = resolve_link(entry_url, &self.base_url)?;
        let mut visited = HashSet::new();
        let mut content = String::new();
        let mut pages = 0u32;

        loop {
            let key = normalize_url(next.as_str())?;
            if !visited.insert(key) {
                return Err(NovelError::PaginationLimit {
                    url: next.to_string(),
                    reason: "next-page link leads back to a visited page".to_string(),
                });
            }

            if pages >= self.max_pages {
                return Err(NovelError::PaginationLimit {
                    url: next.to_string(),
                    reason: format!("chapter exceeds {} pages", self.max_pages),
                });
            }

            let page = self.source.fetch_and_extract(&next).await?;
            pages += 1;
            content.push_str(&page.content);

            if !self.pagination || is_last_page(page.next_link.as_ref(), &self.last_page_marker) {
                break;
            }

            let href = page
                .next_link
                .as_ref()
                .and_then(|link| link.href.as_deref())
                .unwrap_or_default();
            next = resolve_link(href, &self.base_url)?;

            self.pacer.pause(interval).await;
        }

        tracing::trace!("Assembled {} from {} page(s)", entry_url, pages);
        Ok(content)
    }
}
