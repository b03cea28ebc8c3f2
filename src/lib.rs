//! dspider: a small pattern-routed web crawling framework
//!
//! A [`crawler::Spider`] drains a shared queue of URLs with a fixed pool of
//! workers. Each URL is routed by first-match regular expression to a
//! document parser, fetched through a retry policy, and handed to the parser,
//! which may store records (routed by URL to a storage sink) and enqueue
//! follow-up URLs.
//!
//! The `kickstarter` and `output` modules are an application built on top of
//! the framework: a Kickstarter discover-API scraper and a CSV report tool.

pub mod config;
pub mod crawler;
pub mod kickstarter;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for dspider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("no storage for url '{url}'")]
    NoStorage { url: String },

    #[error("Queue is closed, cannot enqueue '{url}'")]
    QueueClosed { url: String },

    #[error("Spider has already been shut down")]
    AlreadyShutDown,

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Failed to parse '{url}': {message}")]
    Parse { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpiderError {
    /// Returns true for usage and construction errors.
    ///
    /// These indicate a programming error rather than a runtime condition;
    /// callers are expected to abort instead of logging and continuing.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::InvalidPattern { .. }
            | Self::QueueClosed { .. }
            | Self::AlreadyShutDown => true,
            Self::Storage(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for dspider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, DocParser, Page, RetryPolicy, Spider, SpiderBuilder, SpiderHandle};
pub use storage::{Record, SqlStorage, Storage};
