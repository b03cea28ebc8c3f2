//! Integration tests for the spider
//!
//! These tests use wiremock to create mock HTTP servers and drive the worker
//! pool, the routing tables and the retry policy over real HTTP.

use async_trait::async_trait;
use dspider::crawler::{
    fetch_page, Crawler, DocParser, FetchError, Page, RetryPolicy, Spider, SpiderBuilder,
    SpiderHandle,
};
use dspider::kickstarter::CompletionTracker;
use dspider::SpiderError;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One parser invocation: (parser name, url, status, body)
type Call = (&'static str, String, Option<u16>, Option<String>);

#[derive(Default)]
struct Calls(Mutex<Vec<Call>>);

impl Calls {
    fn sorted(&self) -> Vec<Call> {
        let mut calls = self.0.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

/// Records every invocation
struct RecordingParser {
    name: &'static str,
    calls: Arc<Calls>,
}

#[async_trait]
impl DocParser for RecordingParser {
    async fn parse(
        &self,
        url: &str,
        page: Option<Page>,
        _spider: &SpiderHandle,
    ) -> Result<(), SpiderError> {
        self.calls.0.lock().unwrap().push((
            self.name,
            url.to_string(),
            page.as_ref().map(|p| p.status),
            page.map(|p| p.text().into_owned()),
        ));
        Ok(())
    }
}

fn recording(name: &'static str, calls: &Arc<Calls>) -> Arc<RecordingParser> {
    Arc::new(RecordingParser {
        name,
        calls: calls.clone(),
    })
}

fn builder() -> SpiderBuilder {
    Spider::builder(Client::new())
        .max_crawls(3)
        .retry_policy(RetryPolicy::never())
}

async fn mount_page(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_dispatch_to_first_matching_parser() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/a/x", "page a").await;
    mount_page(&server, "/b/x", "page b").await;

    let calls = Arc::new(Calls::default());
    let spider = builder()
        .add_doc_parser(&format!("^{}/a/", regex::escape(&base)), recording("A", &calls))
        .unwrap()
        .add_doc_parser(&format!("^{}/", regex::escape(&base)), recording("B", &calls))
        .unwrap()
        .build()
        .unwrap();

    spider.queue(format!("{}/a/x", base)).unwrap();
    spider.queue(format!("{}/b/x", base)).unwrap();
    spider.shutdown().await.unwrap();

    assert_eq!(
        calls.sorted(),
        vec![
            ("A", format!("{}/a/x", base), Some(200), Some("page a".to_string())),
            ("B", format!("{}/b/x", base), Some(200), Some("page b".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_server_error_is_retried_then_parsed_without_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let calls = Arc::new(Calls::default());
    let spider = builder()
        .retry_policy(RetryPolicy::new(2, Duration::from_millis(10)))
        .add_doc_parser("/down$", recording("P", &calls))
        .unwrap()
        .build()
        .unwrap();

    let url = format!("{}/down", server.uri());
    let start = Instant::now();
    spider.queue(url.clone()).unwrap();
    spider.shutdown().await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(calls.sorted(), vec![("P", url, None, None)]);
    assert_eq!(spider.stats().fetch_failures, 1);
}

#[tokio::test]
async fn test_retry_recovers_after_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", "finally").await;

    let calls = Arc::new(Calls::default());
    let spider = builder()
        .retry_policy(RetryPolicy::new(3, Duration::from_millis(5)))
        .add_doc_parser("/flaky$", recording("P", &calls))
        .unwrap()
        .build()
        .unwrap();

    let url = format!("{}/flaky", server.uri());
    spider.queue(url.clone()).unwrap();
    spider.shutdown().await.unwrap();

    assert_eq!(
        calls.sorted(),
        vec![("P", url, Some(200), Some("finally".to_string()))]
    );
    assert_eq!(spider.stats().fetched, 1);
}

#[tokio::test]
async fn test_url_without_parser_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let calls = Arc::new(Calls::default());
    let spider = builder()
        .add_doc_parser("^https://elsewhere/", recording("P", &calls))
        .unwrap()
        .build()
        .unwrap();

    spider.queue(format!("{}/ignored", server.uri())).unwrap();
    spider.shutdown().await.unwrap();

    assert!(calls.sorted().is_empty());
    assert_eq!(spider.stats().skipped, 1);
}

/// Fetches with an API key header
struct KeyedCrawler;

#[async_trait]
impl Crawler for KeyedCrawler {
    async fn crawl(&self, client: &Client, url: &str) -> Result<Page, FetchError> {
        fetch_page(url, client.get(url).header("x-api-key", "secret")).await
    }
}

#[tokio::test]
async fn test_custom_crawler_is_used_for_matching_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("items"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/public", "public").await;

    let calls = Arc::new(Calls::default());
    let spider = builder()
        .add_doc_parser("^", recording("P", &calls))
        .unwrap()
        .add_crawler("/api/", Arc::new(KeyedCrawler))
        .unwrap()
        .build()
        .unwrap();

    spider.queue(format!("{}/api/items", server.uri())).unwrap();
    spider.queue(format!("{}/public", server.uri())).unwrap();
    spider.shutdown().await.unwrap();

    let bodies: Vec<Option<String>> = calls.sorted().into_iter().map(|c| c.3).collect();
    assert_eq!(
        bodies,
        vec![Some("items".to_string()), Some("public".to_string())]
    );
}

/// Keeps the raw body of every page
struct BodyParser(Arc<Mutex<Vec<Vec<u8>>>>);

#[async_trait]
impl DocParser for BodyParser {
    async fn parse(
        &self,
        _url: &str,
        page: Option<Page>,
        _spider: &SpiderHandle,
    ) -> Result<(), SpiderError> {
        if let Some(page) = page {
            self.0.lock().unwrap().push(page.body.to_vec());
        }
        Ok(())
    }
}

/// Follows `/chain/{n}` up to `/chain/{last}`
struct ChainParser {
    last: u32,
    tracker: CompletionTracker,
    visited: Mutex<Vec<u32>>,
}

#[async_trait]
impl DocParser for ChainParser {
    async fn parse(
        &self,
        url: &str,
        page: Option<Page>,
        spider: &SpiderHandle,
    ) -> Result<(), SpiderError> {
        let n: u32 = page
            .and_then(|p| p.text().parse().ok())
            .unwrap_or(self.last);
        self.visited.lock().unwrap().push(n);

        if n < self.last {
            let next = url.replace(&format!("/chain/{}", n), &format!("/chain/{}", n + 1));
            spider.queue(next)?;
        } else {
            self.tracker.done();
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_parser_enqueues_follow_up_urls() {
    let server = MockServer::start().await;
    for n in 0..5 {
        mount_page(&server, &format!("/chain/{}", n), &n.to_string()).await;
    }

    let parser = Arc::new(ChainParser {
        last: 4,
        tracker: CompletionTracker::new(),
        visited: Mutex::new(Vec::new()),
    });
    let spider = builder()
        .add_doc_parser("/chain/", parser.clone())
        .unwrap()
        .build()
        .unwrap();

    parser.tracker.add(1);
    spider.queue(format!("{}/chain/0", server.uri())).unwrap();
    tokio::time::timeout(Duration::from_secs(10), parser.tracker.wait())
        .await
        .unwrap();
    spider.shutdown().await.unwrap();

    assert_eq!(*parser.visited.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(spider.stats().queued, 5);
}

#[tokio::test]
async fn test_binary_body_reaches_parser_unchanged() {
    let server = MockServer::start().await;
    let raw = vec![0xff, 0x00, 0xfe, b'{'];
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(raw.clone()))
        .mount(&server)
        .await;

    let bodies = Arc::new(Mutex::new(Vec::new()));
    let spider = builder()
        .add_doc_parser("/blob$", Arc::new(BodyParser(bodies.clone())))
        .unwrap()
        .build()
        .unwrap();

    spider.queue(format!("{}/blob", server.uri())).unwrap();
    spider.shutdown().await.unwrap();

    assert_eq!(*bodies.lock().unwrap(), vec![raw]);
}

#[tokio::test]
async fn test_shutdown_semantics() {
    let spider = builder().build().unwrap();
    let handle = spider.handle();

    spider.shutdown().await.unwrap();

    assert!(matches!(
        handle.queue("http://late/"),
        Err(SpiderError::QueueClosed { .. })
    ));
    assert!(matches!(
        spider.shutdown().await,
        Err(SpiderError::AlreadyShutDown)
    ));
}

#[tokio::test]
async fn test_concurrent_producers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(100)
        .mount(&server)
        .await;

    let calls = Arc::new(Calls::default());
    let spider = builder()
        .max_crawls(8)
        .add_doc_parser("^", recording("P", &calls))
        .unwrap()
        .build()
        .unwrap();

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let handle = spider.handle();
            let base = server.uri();
            tokio::spawn(async move {
                for i in 0..25 {
                    handle.queue(format!("{}/p{}/{}", base, p, i)).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }
    spider.shutdown().await.unwrap();

    let mut urls: Vec<String> = calls.sorted().into_iter().map(|c| c.1).collect();
    urls.dedup();
    assert_eq!(urls.len(), 100);
}
