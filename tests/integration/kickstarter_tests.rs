//! End-to-end tests for the Kickstarter scraper
//!
//! A wiremock server stands in for the discover API; the crawl writes into a
//! temporary SQLite database that is then exported with the report tool.

use dspider::config::{Config, KickstarterConfig};
use dspider::crawler::build_http_client;
use dspider::kickstarter::{crawl, PROJECTS_TABLE};
use dspider::output::{generate_report, ReportOptions};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn project(id: i64, state: &str, slug: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("project {}", id),
        "blurb": "a project",
        "goal": 1000.0,
        "pledged": 250.0 * id as f64,
        "state": state,
        "country": "US",
        "currency": "USD",
        "deadline": 1_462_060_800,
        "created_at": 1_456_790_400,
        "launched_at": 1_456_790_400,
        "backers_count": id,
        "static_usd_rate": 1.0,
        "category": {"id": 1, "name": "Gadgets", "slug": slug},
        "urls": {"web": {"project": format!("https://www.kickstarter.com/projects/p{}", id)}}
    })
}

fn config(base_url: String, categories: &[&str]) -> Config {
    let mut config = Config {
        kickstarter: KickstarterConfig {
            base_url,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..KickstarterConfig::default()
        },
        ..Config::default()
    };
    config.spider.max_crawl_retries = 1;
    config.spider.crawl_retry_interval_ms = 5;
    config
}

fn stored_ids(db: &Path) -> Vec<i64> {
    let conn = Connection::open(db).unwrap();
    let mut stmt = conn
        .prepare(&format!("SELECT id FROM {} ORDER BY id", PROJECTS_TABLE))
        .unwrap();
    let ids = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<i64>, _>>()
        .unwrap();
    ids
}

#[tokio::test]
async fn test_crawl_follows_pages_and_stores_finished_projects() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover/categories/technology"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [project(1, "successful", "technology"), project(3, "failed", "technology")],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/discover/categories/technology"))
        .and(query_param("format", "json"))
        .and(query_param("sort", "end_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [project(1, "successful", "technology"), project(2, "live", "technology")],
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/discover/categories/crafts"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("kickstarter.sqlite3");
    let config = config(server.uri(), &["technology", "crafts"]);
    let client = build_http_client(&config.user_agent).unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(30), crawl(&config, client, &db))
        .await
        .unwrap()
        .unwrap();

    // Project 1 is on both pages; the second insert is a rejected duplicate.
    assert_eq!(stored_ids(&db), vec![1, 3]);
    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.stored, 2);
    assert_eq!(stats.storage_failures, 1);
}

#[tokio::test]
async fn test_crawl_finishes_with_non_canonical_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/categories/design"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [project(2, "failed", "design")],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/categories/design"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [project(1, "successful", "design")],
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    // `url::Url` lowercases the scheme and drops the trailing slash on
    // follow-up pages; the crawl must still route them.
    let base_url = format!("{}/", server.uri().replacen("http", "HTTP", 1));
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("kickstarter.sqlite3");
    let config = config(base_url, &["design"]);
    let client = build_http_client(&config.user_agent).unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(30), crawl(&config, client, &db))
        .await
        .expect("crawl did not finish")
        .unwrap();

    assert_eq!(stored_ids(&db), vec![1, 2]);
    assert_eq!(stats.fetched, 2);
}

#[tokio::test]
async fn test_crawl_survives_undecodable_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/categories/design"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("kickstarter.sqlite3");
    let config = config(server.uri(), &["design"]);
    let client = build_http_client(&config.user_agent).unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(30), crawl(&config, client, &db))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.parse_failures, 1);
    assert!(stored_ids(&db).is_empty());
}

#[tokio::test]
async fn test_crawled_database_exports_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/categories/technology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [
                project(1, "successful", "technology/gadgets"),
                project(2, "failed", "technology/diy"),
                project(3, "successful", "technology/gadgets")
            ],
            "has_more": false
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("kickstarter.sqlite3");
    let config = config(server.uri(), &["technology"]);
    let client = build_http_client(&config.user_agent).unwrap();
    crawl(&config, client, &db).await.unwrap();

    let mut options = ReportOptions::new(&db);
    options.output_base = dir.path().join("ks").to_string_lossy().into_owned();
    let summary = generate_report(&options).unwrap();

    assert_eq!(summary.rows, 3);
    assert_eq!(summary.groups, vec!["technology/diy", "technology/gadgets"]);

    let gadgets = std::fs::read_to_string(dir.path().join("ks-technology_gadgets.csv")).unwrap();
    assert_eq!(gadgets.lines().count(), 3);
    assert!(gadgets.contains("2016-03-01T00-00-00"));

    let stats = std::fs::read_to_string(dir.path().join("ks-stats.csv")).unwrap();
    let march = stats.lines().nth(3).unwrap();
    // Launched in March: goals 1000 each, pledged 250 + 500 + 750.
    assert!(march.starts_with("03,3,1000.0,500.0,0.5,"));
}
