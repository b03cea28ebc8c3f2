//! Spider - the crawl orchestrator
//!
//! A spider owns a fixed pool of worker tasks that pull URLs from one shared,
//! unbounded FIFO queue. For every URL a worker:
//! 1. Looks up a document parser (no parser: the URL is dropped unfetched)
//! 2. Looks up a fetch strategy, falling back to [`DefaultCrawler`]
//! 3. Fetches the page through the [`RetryPolicy`]
//! 4. Invokes the parser with the page, or with `None` when every attempt
//!    failed
//!
//! Routes are registered on a [`SpiderBuilder`] and frozen when the workers
//! start, so lookups never race with registration. Fetch failures, parser
//! errors and storage routing misses are logged; none of them stops the
//! crawl.

use crate::crawler::fetcher::{Crawler, DefaultCrawler, FetchError, Page};
use crate::crawler::parser::DocParser;
use crate::crawler::registry::Registry;
use crate::crawler::retry::RetryPolicy;
use crate::storage::{Record, Storage};
use crate::{ConfigError, SpiderError};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Default number of concurrent workers
pub const DEFAULT_MAX_CRAWLS: usize = 2;

/// Counters collected while crawling
#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    skipped: AtomicU64,
    fetched: AtomicU64,
    fetch_failures: AtomicU64,
    parse_failures: AtomicU64,
    stored: AtomicU64,
    storage_failures: AtomicU64,
}

/// Snapshot of a spider's crawl counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// URLs accepted by the queue
    pub queued: u64,
    /// URLs dropped because no parser matched
    pub skipped: u64,
    /// URLs fetched successfully
    pub fetched: u64,
    /// URLs whose fetch failed after all retries
    pub fetch_failures: u64,
    /// Parser invocations that returned an error
    pub parse_failures: u64,
    /// Records accepted by a storage sink
    pub stored: u64,
    /// Records rejected by routing or by a storage sink
    pub storage_failures: u64,
}

/// State shared by the spider, its workers and the parsers
struct Shared {
    client: Client,
    parsers: Registry<Arc<dyn DocParser>>,
    crawlers: Registry<Arc<dyn Crawler>>,
    storages: Registry<Arc<dyn Storage>>,
    retry: RetryPolicy,
    /// `None` once the queue has been closed
    queue: Mutex<Option<UnboundedSender<String>>>,
    counters: Counters,
}

/// Handle given to parsers for storing records and enqueueing URLs
///
/// Cloning is cheap; all clones refer to the same spider.
#[derive(Clone)]
pub struct SpiderHandle {
    shared: Arc<Shared>,
}

impl SpiderHandle {
    /// Enqueues one URL for crawling
    ///
    /// Safe to call concurrently from any number of producers, including
    /// parsers running on the spider's own workers.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The URL was enqueued
    /// * `Err(SpiderError::QueueClosed)` - Shutdown has already closed the queue
    pub fn queue(&self, url: impl Into<String>) -> Result<(), SpiderError> {
        let url = url.into();
        let sender = self
            .shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(sender) = sender.as_ref() else {
            tracing::warn!("Refusing to queue '{}': queue is closed", url);
            return Err(SpiderError::QueueClosed { url });
        };

        sender
            .send(url)
            .map_err(|e| SpiderError::QueueClosed { url: e.0 })?;
        self.shared.counters.queued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stores a record in the storage routed to by `url`
    ///
    /// Meant for parsers only.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record was stored
    /// * `Err(SpiderError::NoStorage)` - No storage route matches `url`
    /// * `Err(SpiderError::Storage)` - The storage rejected the record
    pub fn add_doc(&self, url: &str, record: &dyn Record) -> Result<(), SpiderError> {
        let counters = &self.shared.counters;

        let Some(storage) = self.shared.storages.find(url) else {
            tracing::warn!(url, table = record.table(), "No storage route for record");
            counters.storage_failures.fetch_add(1, Ordering::Relaxed);
            return Err(SpiderError::NoStorage {
                url: url.to_string(),
            });
        };

        match storage.add_doc(record) {
            Ok(()) => {
                counters.stored.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                counters.storage_failures.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    /// Returns a snapshot of the crawl counters
    pub fn stats(&self) -> CrawlStats {
        let c = &self.shared.counters;
        CrawlStats {
            queued: c.queued.load(Ordering::Relaxed),
            skipped: c.skipped.load(Ordering::Relaxed),
            fetched: c.fetched.load(Ordering::Relaxed),
            fetch_failures: c.fetch_failures.load(Ordering::Relaxed),
            parse_failures: c.parse_failures.load(Ordering::Relaxed),
            stored: c.stored.load(Ordering::Relaxed),
            storage_failures: c.storage_failures.load(Ordering::Relaxed),
        }
    }

    /// Processes a single dequeued URL
    async fn process(&self, url: &str) {
        let counters = &self.shared.counters;

        let Some(parser) = self.shared.parsers.find(url) else {
            tracing::trace!("No parser for '{}', skipping", url);
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        tracing::debug!("Crawling '{}' ...", url);
        let page = match self.fetch(url).await {
            Ok(page) => {
                counters.fetched.fetch_add(1, Ordering::Relaxed);
                Some(page)
            }
            Err(e) => {
                tracing::warn!("Failed to crawl '{}': {}", url, e);
                counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                None
            }
        };

        if let Err(e) = parser.parse(url, page, self).await {
            tracing::warn!("Failed to parse '{}': {}", url, e);
            counters.parse_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Fetches `url` with the first matching strategy, under the retry policy
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let crawler: &dyn Crawler = match self.shared.crawlers.find(url) {
            Some(crawler) => crawler.as_ref(),
            None => &DefaultCrawler,
        };
        let client = &self.shared.client;

        self.shared
            .retry
            .run(move || crawler.crawl(client, url))
            .await
    }
}

/// Registers routes and starts a [`Spider`]
pub struct SpiderBuilder {
    client: Client,
    max_crawls: usize,
    retry: RetryPolicy,
    parsers: Registry<Arc<dyn DocParser>>,
    crawlers: Registry<Arc<dyn Crawler>>,
    storages: Registry<Arc<dyn Storage>>,
}

impl SpiderBuilder {
    /// Creates a builder around the shared HTTP client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_crawls: DEFAULT_MAX_CRAWLS,
            retry: RetryPolicy::default(),
            parsers: Registry::new(),
            crawlers: Registry::new(),
            storages: Registry::new(),
        }
    }

    /// Sets the number of concurrent workers
    pub fn max_crawls(mut self, max_crawls: usize) -> Self {
        self.max_crawls = max_crawls;
        self
    }

    /// Sets the retry policy wrapped around every fetch
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Routes URLs matching `pattern` to `parser`
    pub fn add_doc_parser(
        mut self,
        pattern: &str,
        parser: Arc<dyn DocParser>,
    ) -> Result<Self, SpiderError> {
        self.parsers.add(pattern, parser)?;
        Ok(self)
    }

    /// Fetches URLs matching `pattern` with `crawler` instead of a plain GET
    pub fn add_crawler(
        mut self,
        pattern: &str,
        crawler: Arc<dyn Crawler>,
    ) -> Result<Self, SpiderError> {
        self.crawlers.add(pattern, crawler)?;
        Ok(self)
    }

    /// Stores records keyed by URLs matching `pattern` in `storage`
    pub fn add_storage(
        mut self,
        pattern: &str,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, SpiderError> {
        self.storages.add(pattern, storage)?;
        Ok(self)
    }

    /// Freezes the routes and starts the workers
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<Spider, SpiderError> {
        if self.max_crawls == 0 {
            return Err(ConfigError::Validation(
                "max_crawls must be at least 1".to_string(),
            )
            .into());
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = SpiderHandle {
            shared: Arc::new(Shared {
                client: self.client,
                parsers: self.parsers,
                crawlers: self.crawlers,
                storages: self.storages,
                retry: self.retry,
                queue: Mutex::new(Some(sender)),
                counters: Counters::default(),
            }),
        };

        tracing::info!(
            "Starting spider: {} workers, {} parser / {} crawler / {} storage routes, {} retries every {:?}",
            self.max_crawls,
            handle.shared.parsers.len(),
            handle.shared.crawlers.len(),
            handle.shared.storages.len(),
            self.retry.times,
            self.retry.interval
        );
        for (kind, patterns) in [
            ("parser", handle.shared.parsers.patterns().collect::<Vec<_>>()),
            ("crawler", handle.shared.crawlers.patterns().collect()),
            ("storage", handle.shared.storages.patterns().collect()),
        ] {
            for pattern in patterns {
                tracing::debug!("{} route: {}", kind, pattern);
            }
        }

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let workers = (0..self.max_crawls)
            .map(|worker| tokio::spawn(crawl_loop(handle.clone(), receiver.clone(), worker)))
            .collect();

        Ok(Spider {
            handle,
            workers: Mutex::new(workers),
        })
    }
}

/// A running crawl: a worker pool draining a shared URL queue
pub struct Spider {
    handle: SpiderHandle,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Spider {
    /// Starts building a spider around the shared HTTP client
    pub fn builder(client: Client) -> SpiderBuilder {
        SpiderBuilder::new(client)
    }

    /// Enqueues one URL for crawling (see [`SpiderHandle::queue`])
    pub fn queue(&self, url: impl Into<String>) -> Result<(), SpiderError> {
        self.handle.queue(url)
    }

    /// Returns a handle that can enqueue URLs from other tasks
    pub fn handle(&self) -> SpiderHandle {
        self.handle.clone()
    }

    /// Returns a snapshot of the crawl counters
    pub fn stats(&self) -> CrawlStats {
        self.handle.stats()
    }

    /// Closes the queue and waits for every worker to drain it and exit
    ///
    /// URLs already in the queue are still processed; only new enqueues are
    /// refused.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - All workers have exited
    /// * `Err(SpiderError::AlreadyShutDown)` - Shutdown was already called
    pub async fn shutdown(&self) -> Result<(), SpiderError> {
        let sender = self
            .handle
            .shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return Err(SpiderError::AlreadyShutDown);
        }
        drop(sender);

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        tracing::debug!("Queue closed, waiting for {} workers", workers.len());

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!("Spider worker terminated abnormally: {}", e);
            }
        }

        let stats = self.stats();
        tracing::info!(
            "Spider shut down: {} queued, {} skipped, {} fetched, {} fetch failures, {} parse failures, {} stored, {} storage failures",
            stats.queued,
            stats.skipped,
            stats.fetched,
            stats.fetch_failures,
            stats.parse_failures,
            stats.stored,
            stats.storage_failures
        );
        Ok(())
    }
}

impl Drop for Spider {
    fn drop(&mut self) {
        // Without a sender the workers drain the queue and exit on their own.
        self.handle
            .shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// One worker: dequeue until the queue is closed and drained
async fn crawl_loop(
    handle: SpiderHandle,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<String>>>,
    worker: usize,
) {
    tracing::trace!("Worker {} started", worker);
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(url) = next else {
            break;
        };
        handle.process(&url).await;
    }
    tracing::trace!("Worker {} finished", worker);
}
