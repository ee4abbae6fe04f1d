//! Integration tests for batch downloads
//!
//! The catalog, TOC and chapter pages are served by wiremock; some tests
//! swap the collaborators for in-memory fakes to observe the orchestration.

use async_trait::async_trait;
use novel_ripple::batch::{
    parse_batch_list, BatchEntry, BatchOrchestrator, CatalogSearch, RuleCatalog, RuleToc, TocSource,
};
use novel_ripple::config::{parse_config, Config};
use novel_ripple::crawler::{build_http_client, BookCrawler};
use novel_ripple::model::BookReport;
use novel_ripple::output::{not_found_log_path, BookSink, BookWriter};
use novel_ripple::{BookMeta, Chapter, NovelError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(base_url: &str, download_dir: &Path) -> Config {
    let toml = format!(
        r##"
source-id = 7

[crawl]
max-retry-attempts = 2
min-interval = 1
max-interval = 5
retry-min-interval = 5
retry-max-interval = 10
timeout-ms = 2000
max-concurrent-chapters = 4

[output]
download-path = '{download}'
ext-name = "txt"

[rule]
url = "{base_url}/"

[rule.chapter]
content = "#content"

[rule.toc]
item = "#list dd > a"

[rule.search]
url = "{base_url}/search?q=%s"
result = "table.grid tr"
book-name = "td.name a"
author = "td.author"
"##,
        download = download_dir.display(),
    );
    parse_config(&toml).expect("Failed to build test config")
}

fn search_page(rows: &[(&str, &str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(name, author, href)| {
            format!(
                r#"<tr><td class="name"><a href="{}">{}</a></td><td class="author">{}</td></tr>"#,
                href, name, author
            )
        })
        .collect();
    format!(r#"<html><body><table class="grid">{}</table></body></html>"#, rows)
}

fn toc_page(chapters: &[(&str, &str)]) -> String {
    let items: String = chapters
        .iter()
        .map(|(title, href)| format!(r#"<dd><a href="{}">{}</a></dd>"#, href, title))
        .collect();
    format!(r#"<html><body><div id="list"><dl>{}</dl></div></body></html>"#, items)
}

async fn mount_html(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn orchestrator(config: &Config) -> BatchOrchestrator {
    let timeout = config.crawl.timeout();
    let client = build_http_client(&config.client, timeout).unwrap();
    BatchOrchestrator::new(
        Arc::new(RuleCatalog::new(client.clone(), &config.rule, timeout).unwrap()),
        Arc::new(RuleToc::new(client, &config.rule, timeout).unwrap()),
        BookCrawler::from_config(config).unwrap(),
        Arc::new(BookWriter::new(&config.output.download_path, "txt")),
        config.source_id,
    )
}

#[tokio::test]
async fn test_batch_downloads_found_books_and_lists_missing_ones() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "剑来"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[
            ("剑来", "烽火戏诸侯", "/book/1/"),
            ("剑来", "别人", "/book/2/"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "不存在"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[])))
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/book/1/",
        toc_page(&[
            ("第一章 惊蛰", "/book/1/1.html"),
            ("第二章 开门", "/book/1/2.html"),
            ("第三章 日出", "/book/1/3.html"),
        ]),
    )
    .await;
    for (i, text) in ["一", "二", "三"].iter().enumerate() {
        mount_html(
            &server,
            &format!("/book/1/{}.html", i + 1),
            format!(r#"<div id="content"><p>正文{}</p></div>"#, text),
        )
        .await;
    }

    let config = create_test_config(&server.uri(), dir.path());
    let entries = parse_batch_list("剑来 烽火戏诸侯\n不存在 无名氏\n#\n");

    let report = orchestrator(&config).run(&entries).await;

    assert_eq!(report.requested, 2);
    assert_eq!(report.found(), 1);
    assert_eq!(report.books.len(), 1);
    assert_eq!(report.total_succeeded(), 3);
    assert_eq!(report.total_failed(), 0);
    assert!(report.skipped.is_empty());
    assert_eq!(
        report.books[0].book.url,
        format!("{}/book/1/", server.uri())
    );

    let book = std::fs::read_to_string(dir.path().join("剑来(烽火戏诸侯).txt")).unwrap();
    let positions: Vec<usize> = ["正文一", "正文二", "正文三"]
        .iter()
        .map(|text| book.find(text).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(book.contains("第二章 开门"));

    let not_found_path = not_found_log_path(dir.path(), 7);
    assert_eq!(report.not_found_log.as_deref(), Some(not_found_path.as_path()));
    let missing = std::fs::read_to_string(not_found_path).unwrap();
    assert!(missing.starts_with("不存在 无名氏\n#\n"));
    assert_eq!(parse_batch_list(&missing).len(), 1);
}

/// Catalog answering from a fixed table; unknown names are a search error
struct FakeCatalog {
    books: HashMap<String, BookMeta>,
}

#[async_trait]
impl CatalogSearch for FakeCatalog {
    async fn search(&self, book_name: &str) -> Result<Vec<BookMeta>, NovelError> {
        self.books
            .get(book_name)
            .map(|book| vec![book.clone()])
            .ok_or_else(|| NovelError::Collaborator(format!("search for {} failed", book_name)))
    }
}

/// TOC source listing one chapter per book, except for a broken book
struct FakeToc {
    broken: String,
}

#[async_trait]
impl TocSource for FakeToc {
    async fn chapters(&self, book: &BookMeta) -> Result<Vec<Chapter>, NovelError> {
        if book.book_name == self.broken {
            return Err(NovelError::Collaborator("toc unavailable".to_string()));
        }
        Ok(vec![Chapter::new(
            "第一章",
            format!("/{}.html", book.book_name),
            1,
        )])
    }
}

/// Sink recording the order books are written in
#[derive(Default)]
struct RecordingSink {
    written: Mutex<Vec<String>>,
}

#[async_trait]
impl BookSink for RecordingSink {
    async fn write(&self, report: &BookReport) -> Result<PathBuf, NovelError> {
        self.written.lock().unwrap().push(report.book.book_name.clone());
        Ok(PathBuf::from(&report.book.book_name))
    }
}

#[tokio::test]
async fn test_batch_runs_books_in_order_and_skips_broken_ones() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for name in ["a", "b", "c", "d"] {
        mount_html(
            &server,
            &format!("/{}.html", name),
            format!(r#"<div id="content">{}</div>"#, name),
        )
        .await;
    }

    let books: HashMap<String, BookMeta> = ["a", "b", "c", "d"]
        .iter()
        .map(|name| {
            (
                name.to_string(),
                BookMeta::new(*name, "作者", format!("{}/{}/", server.uri(), name)),
            )
        })
        .collect();

    let config = create_test_config(&server.uri(), dir.path());
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = BatchOrchestrator::new(
        Arc::new(FakeCatalog { books }),
        Arc::new(FakeToc {
            broken: "c".to_string(),
        }),
        BookCrawler::from_config(&config).unwrap(),
        sink.clone(),
        config.source_id,
    );

    let entries = vec![
        BatchEntry {
            book_name: "d".to_string(),
            author: "作者".to_string(),
        },
        BatchEntry {
            book_name: "x".to_string(),
            author: "作者".to_string(),
        },
        BatchEntry {
            book_name: "c".to_string(),
            author: "作者".to_string(),
        },
        BatchEntry {
            book_name: "a".to_string(),
            author: "别人".to_string(),
        },
        BatchEntry {
            book_name: "b".to_string(),
            author: "作者".to_string(),
        },
    ];

    let report = orchestrator.run(&entries).await;

    // "x" fails to search and "a" has the wrong author: both are not found
    let missing: Vec<&str> = report.not_found.iter().map(|e| e.book_name.as_str()).collect();
    assert_eq!(missing, vec!["x", "a"]);

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0.book_name, "c");

    assert_eq!(*sink.written.lock().unwrap(), vec!["d", "b"]);
    let crawled: Vec<&str> = report.books.iter().map(|b| b.book.book_name.as_str()).collect();
    assert_eq!(crawled, vec!["d", "b"]);

    let expected_total: f64 = report.books.iter().map(|b| b.result.elapsed_seconds).sum();
    assert!((report.total_elapsed_seconds - expected_total).abs() < 1e-9);
}

#[tokio::test]
async fn test_batch_with_no_found_books_writes_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[])))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), dir.path());
    let entries = parse_batch_list("无此书 无名氏
也没有 某人
");

    let report = orchestrator(&config).run(&entries).await;

    assert_eq!(report.requested, 2);
    assert_eq!(report.found(), 0);
    assert_eq!(report.not_found.len(), 2);
    assert!(report.books.is_empty());
    assert!(report.not_found_log.is_none());
    assert!(!not_found_log_path(dir.path(), 7).exists());
}
