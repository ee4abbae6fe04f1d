//! Chapter page parser
//!
//! This module applies a source's chapter rule to a fetched page:
//! - Chapter body extraction via the content selector
//! - "Next page" link extraction via the next-page selector
//! - The last-page predicate that ends a paginated chapter

use crate::config::ChapterRule;
use crate::url::is_navigable_href;
use crate::{ConfigError, NovelError};
use scraper::{ElementRef, Html, Selector};

/// Compiled selectors of a chapter rule
#[derive(Debug, Clone)]
pub struct ChapterSelectors {
    content: Selector,
    next_page: Option<Selector>,
}

impl ChapterSelectors {
    pub fn compile(rule: &ChapterRule) -> Result<Self, ConfigError> {
        let content = compile_selector(&rule.content)?;
        let next_page = rule
            .next_page
            .as_deref()
            .map(compile_selector)
            .transpose()?;

        Ok(Self { content, next_page })
    }
}

pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// The "next page" link of a chapter page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextLink {
    /// Visible text of every element the selector matched
    pub text: String,

    /// `href` of the first matched element carrying one
    pub href: Option<String>,
}

/// What one chapter page contributes to the chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Inner HTML of the content nodes
    pub content: String,

    /// The next-page link, if the rule has one and the page contains it
    pub next_link: Option<NextLink>,
}

/// Extracts chapter content and the next-page link from an HTML page
///
/// The inner HTML of every node matched by the content selector is joined
/// with newlines. A page whose content selector matches nothing, or only
/// blank nodes, is a parse error: sites commonly answer throttled requests
/// with an empty layout, and the retry loop must see that as a failure.
///
/// # Example
///
/// ```
/// use novel_ripple::config::ChapterRule;
/// use novel_ripple::crawler::{extract_page, ChapterSelectors};
///
/// let rule = ChapterRule {
///     content: "#content".to_string(),
///     next_page: Some("#next".to_string()),
///     pagination: true,
///     last_page_marker: "下一章".to_string(),
/// };
/// let selectors = ChapterSelectors::compile(&rule).unwrap();
/// let html = r#"<div id="content"><p>one</p></div><a id="next" href="/1_2.html">下一页</a>"#;
///
/// let page = extract_page(html, &selectors, "https://example.com/1.html").unwrap();
/// assert_eq!(page.content, "<p>one</p>");
/// assert_eq!(page.next_link.unwrap().href.as_deref(), Some("/1_2.html"));
/// ```
pub fn extract_page(
    html: &str,
    selectors: &ChapterSelectors,
    url: &str,
) -> Result<ExtractedPage, NovelError> {
    let document = Html::parse_document(html);

    let content = document
        .select(&selectors.content)
        .map(|element| element.inner_html())
        .collect::<Vec<_>>()
        .join("\n");

    if content.trim().is_empty() {
        return Err(NovelError::Parse {
            url: url.to_string(),
            message: "content selector matched no usable node".to_string(),
        });
    }

    let next_link = selectors
        .next_page
        .as_ref()
        .and_then(|selector| extract_next_link(&document, selector));

    Ok(ExtractedPage { content, next_link })
}

fn extract_next_link(document: &Html, selector: &Selector) -> Option<NextLink> {
    let matched: Vec<ElementRef> = document.select(selector).collect();
    if matched.is_empty() {
        return None;
    }

    let text = matched
        .iter()
        .map(|element| element_text(element))
        .collect::<Vec<_>>()
        .join(" ");

    let href = matched
        .iter()
        .find_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string());

    Some(NextLink { text, href })
}

/// Collapsed visible text of an element
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decides whether the chapter ends on the current page
///
/// Sites paginate chapters with a "next page" link that, on the last page,
/// turns into a link to the next chapter. The only signal is its label, so
/// this matches the configured marker text. It is a heuristic: a site that
/// labels both links the same way will stop early or run on, which is why
/// the assembler also caps and de-duplicates pages.
///
/// A missing link, or a link without a usable `href` (empty, `#`,
/// `javascript:;` and the like), also ends the chapter.
pub fn is_last_page(link: Option<&NextLink>, marker: &str) -> bool {
    match link {
        None => true,
        Some(link) => {
            let has_target = link.href.as_deref().is_some_and(is_navigable_href);
            !has_target || (!marker.is_empty() && link.text.contains(marker))
        }
    }
}
