use crate::UrlError;
use url::Url;

/// Normalizes a URL so that two spellings of the same page compare equal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but HTTP and HTTPS
/// 3. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Empty path becomes /
/// 4. Remove fragment (everything after #)
/// 5. Sort query parameters, drop an empty query string
///
/// The host is lowercased by the `url` parser itself. Unlike link
/// classification crawlers, the scheme and `www.` prefix are kept: novel
/// sites frequently serve different content on each.
///
/// # Examples
///
/// ```
/// use novel_ripple::url::normalize_url;
///
/// let url = normalize_url("https://Example.com/book//1_2.html?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/book/1_2.html?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        if params.is_empty() {
            url.set_query(None);
        } else {
            params.sort();
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Resolves a link found on a page against the source's base URL
///
/// Absolute links are returned as-is, root-relative (`/a/b.html`) and
/// relative (`b.html`) links are joined onto `base`. Script, mail and
/// fragment-only links have no page behind them and are rejected.
///
/// # Examples
///
/// ```
/// use novel_ripple::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://www.example.com/").unwrap();
/// let url = resolve_link("/book/12/3_2.html", &base).unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/book/12/3_2.html");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Err(UrlError::Empty);
    }

    if has_non_page_scheme(href) {
        return Err(UrlError::InvalidScheme(href.to_string()));
    }

    let resolved = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Ok(resolved)
    } else {
        Err(UrlError::InvalidScheme(resolved.scheme().to_string()))
    }
}

/// Returns true if `href` can lead to a page
///
/// Empty, fragment-only (`#`, `#top`) and script, mail, phone or data links
/// cannot. These are exactly the links [`resolve_link`] rejects before
/// joining.
///
/// # Examples
///
/// ```
/// use novel_ripple::url::is_navigable_href;
///
/// assert!(is_navigable_href("/book/12/3_2.html"));
/// assert!(!is_navigable_href("javascript:;"));
/// assert!(!is_navigable_href("#"));
/// ```
pub fn is_navigable_href(href: &str) -> bool {
    let href = href.trim();
    !(href.is_empty() || href.starts_with('#') || has_non_page_scheme(href))
}

const NON_PAGE_SCHEMES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

fn has_non_page_scheme(href: &str) -> bool {
    NON_PAGE_SCHEMES.iter().any(|scheme| {
        href.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Normalizes a URL path by removing dot segments and repeated slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", normalized_segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}
