//! Crawler module: the crawl orchestration engine
//!
//! This module contains:
//! - The spider: a bounded worker pool draining a shared URL queue
//! - Ordered, first-match-wins routing tables for parsers, fetch
//!   strategies and storage sinks
//! - The fetch capability and the default HTTP fetch strategy
//! - The retry policy wrapped around every fetch

mod fetcher;
mod parser;
mod registry;
mod retry;
mod spider;

pub use fetcher::{build_http_client, fetch_page, Crawler, DefaultCrawler, FetchError, Page};
pub use parser::DocParser;
pub use registry::Registry;
pub use retry::RetryPolicy;
pub use spider::{CrawlStats, Spider, SpiderBuilder, SpiderHandle, DEFAULT_MAX_CRAWLS};
