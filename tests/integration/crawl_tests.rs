//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full chapter download cycle end-to-end.

use novel_ripple::config::{parse_config, Config};
use novel_ripple::crawler::{crawl_book, BookCrawler};
use novel_ripple::{BookMeta, Chapter};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for a source served by `base_url`
fn create_test_config(base_url: &str, download_dir: &Path, max_attempts: u32, concurrency: u32) -> Config {
    let toml = format!(
        r##"
source-id = 1

[crawl]
max-retry-attempts = {max_attempts}
min-interval = 1
max-interval = 5
retry-min-interval = 5
retry-max-interval = 10
timeout-ms = 2000
max-concurrent-chapters = {concurrency}

[output]
download-path = '{download}'
ext-name = "html"

[rule]
url = "{base_url}/"

[rule.chapter]
content = "#content"
next-page = "#next"
pagination = true
"##,
        download = download_dir.display(),
    );
    parse_config(&toml).expect("Failed to build test config")
}

/// Renders a chapter page with an optional "next" link
fn chapter_page(content: &str, next: Option<(&str, &str)>) -> String {
    let link = next
        .map(|(text, href)| format!(r#"<a id="next" href="{}">{}</a>"#, href, text))
        .unwrap_or_default();
    format!(
        r#"<html><body><div id="content"><p>{}</p></div><div class="nav">{}</div></body></html>"#,
        content, link
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn book(server: &MockServer) -> BookMeta {
    BookMeta::new("测试之书", "某作者", format!("{}/book/", server.uri()))
}

fn toc(count: u32) -> Vec<Chapter> {
    (1..=count)
        .map(|i| Chapter::new(format!("第{}章", i), format!("/{}.html", i), i))
        .collect()
}

fn log_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_paginated_chapter_concatenates_all_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/1.html", chapter_page("甲", Some(("下一页", "/1_2.html")))).await;
    mount_page(&server, "/1_2.html", chapter_page("乙", Some(("下一页", "/1_3.html")))).await;
    mount_page(&server, "/1_3.html", chapter_page("丙", Some(("下一章", "/2.html")))).await;

    // Page 3 links to the next chapter; it must not be followed
    Mock::given(method("GET"))
        .and(path("/2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chapter_page("错", None)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path(), 3, 4);
    let report = crawl_book(&config, &book(&server), toc(1)).await.unwrap();

    assert!(report.result.is_complete());
    assert_eq!(report.chapters.len(), 1);
    assert_eq!(
        report.chapters[0].content.as_deref(),
        Some("<p>甲</p><p>乙</p><p>丙</p>")
    );
}

#[tokio::test]
async fn test_failing_chapter_does_not_stop_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for i in (1..=10).filter(|i| *i != 7) {
        mount_page(&server, &format!("/{}.html", i), chapter_page(&format!("内容{}", i), None)).await;
    }

    // Chapter 7 fails every attempt
    Mock::given(method("GET"))
        .and(path("/7.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path(), 2, 4);
    let crawler = BookCrawler::from_config(&config).unwrap();
    let book = book(&server);

    let report = crawler.crawl(&book, toc(10)).await;

    assert_eq!(report.result.succeeded.len(), 9);
    assert_eq!(report.result.failed.iter().copied().collect::<Vec<_>>(), vec![7]);
    assert_eq!(report.result.total(), 10);
    assert_eq!(report.failures.len(), 1);

    // Successful chapters come back in reading order with content
    let orders: Vec<u32> = report.chapters.iter().map(|c| c.order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4, 5, 6, 8, 9, 10]);
    assert!(report
        .chapters
        .iter()
        .all(|c| c.content.as_deref().is_some_and(|s| !s.is_empty())));

    let lines = log_lines(&crawler.failure_log_path(&book));
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("下载失败章节：【第7章】("));
    assert!(lines[0].contains("/7.html"));
    assert!(lines[0].contains("500"));
}

#[tokio::test]
async fn test_chapters_download_in_parallel() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for i in 1..=5 {
        Mock::given(method("GET"))
            .and(path(format!("/{}.html", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(chapter_page("慢", None))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
    }

    let config = create_test_config(&server.uri(), dir.path(), 1, 5);
    let report = crawl_book(&config, &book(&server), toc(5)).await.unwrap();

    assert!(report.result.is_complete());
    // Sequential downloads would take at least 2s
    assert!(
        report.result.elapsed_seconds < 1.5,
        "crawl took {:.2}s",
        report.result.elapsed_seconds
    );
}

#[tokio::test]
async fn test_slow_page_times_out_and_is_logged() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/1.html", chapter_page("快", None)).await;
    Mock::given(method("GET"))
        .and(path("/2.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(chapter_page("慢", None))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path(), 1, 2);
    let report = crawl_book(&config, &book(&server), toc(2)).await.unwrap();

    assert!(report.result.succeeded.contains(&1));
    assert!(report.result.failed.contains(&2));
    assert!(report.failures[0].reason.to_lowercase().contains("timeout"));
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_log_appends() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/1.html", chapter_page("一", None)).await;
    mount_page(&server, "/3.html", chapter_page("三", None)).await;
    Mock::given(method("GET"))
        .and(path("/2.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path(), 1, 3);
    let crawler = BookCrawler::from_config(&config).unwrap();
    let book = book(&server);

    let first = crawler.crawl(&book, toc(3)).await;
    let log_path = crawler.failure_log_path(&book);
    assert_eq!(log_lines(&log_path).len(), 1);

    let second = crawler.crawl(&book, toc(3)).await;

    assert_eq!(first.chapters, second.chapters);
    assert_eq!(first.result.failed, second.result.failed);

    let lines = log_lines(&log_path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], lines[1]);
}

#[tokio::test]
async fn test_empty_content_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // A throttled response: the layout without the chapter body
    Mock::given(method("GET"))
        .and(path("/1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/1.html", chapter_page("终于", None)).await;

    let config = create_test_config(&server.uri(), dir.path(), 3, 1);
    let report = crawl_book(&config, &book(&server), toc(1)).await.unwrap();

    assert!(report.result.is_complete());
    assert_eq!(report.chapters[0].content.as_deref(), Some("<p>终于</p>"));
}
