//! Kickstarter scraper built on the spider
//!
//! Crawls the discover API of each configured category, page by page, and
//! stores every project that is no longer live in the `projects` table.

mod json;
mod parser;
mod project;
mod tracker;

pub use json::{
    CategoryJson, CreatorJson, LocationJson, ProjectJson, ProjectsPage, UrlsJson, WebUrlsJson,
};
pub use parser::{next_page_url, JsonParser};
pub use project::{projects_table, ProjectRow, PROJECTS_TABLE};
pub use tracker::CompletionTracker;

use crate::config::{Config, KickstarterConfig};
use crate::crawler::{CrawlStats, RetryPolicy, Spider};
use crate::storage::open_storage;
use crate::SpiderError;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// `base_url` in the form `url::Url` serializes it, without a trailing slash
///
/// Follow-up pages are rebuilt through `Url`, which lowercases the host and
/// drops default ports, so seeds and the parser route must use the same form.
fn canonical_base(base_url: &str) -> String {
    match Url::parse(base_url) {
        Ok(url) => url.as_str().trim_end_matches('/').to_string(),
        Err(_) => base_url.trim_end_matches('/').to_string(),
    }
}

/// First page of the discover API for each configured category
pub fn seed_urls(config: &KickstarterConfig) -> Vec<String> {
    let base = canonical_base(&config.base_url);
    config
        .categories
        .iter()
        .map(|category| {
            format!(
                "{}/discover/categories/{}?format=json&sort={}",
                base, category, config.sort
            )
        })
        .collect()
}

/// Route pattern matching every discover-API page under `base_url`
pub fn discover_pattern(base_url: &str) -> String {
    format!(
        "^{}/discover/categories/",
        regex::escape(&canonical_base(base_url))
    )
}

/// Runs a full crawl into the SQLite database at `database_path`
///
/// Returns once every seed chain has finished and the spider has shut down.
pub async fn crawl(
    config: &Config,
    client: Client,
    database_path: &Path,
) -> Result<CrawlStats, SpiderError> {
    let storage = Arc::new(open_storage(database_path, &[projects_table()])?);
    let parser = Arc::new(JsonParser::new());
    let kickstarter = &config.kickstarter;

    let spider = Spider::builder(client)
        .max_crawls(config.spider.max_concurrent_crawls)
        .retry_policy(RetryPolicy::new(
            config.spider.max_crawl_retries,
            Duration::from_millis(config.spider.crawl_retry_interval_ms),
        ))
        .add_doc_parser(&discover_pattern(&kickstarter.base_url), parser.clone())?
        .add_storage(&kickstarter.project_url_pattern, storage.clone())?
        .build()?;

    let seeds = seed_urls(kickstarter);
    parser.tracker().add(seeds.len());
    for seed in seeds {
        tracing::info!("Queueing seed {}", seed);
        spider.queue(seed)?;
    }

    parser.tracker().wait().await;
    spider.shutdown().await?;

    let stats = spider.stats();
    tracing::info!(
        "Stored {} projects in {} ({} rows total)",
        stats.stored,
        database_path.display(),
        storage.count_rows(PROJECTS_TABLE)?
    );
    Ok(stats)
}
