//! Configuration module for dspider
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files for the crawl binary. Every key is optional and falls back to the
//! defaults of the Kickstarter crawl.
//!
//! # Example
//!
//! ```no_run
//! use dspider::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("dspider.toml")).unwrap();
//! println!("Crawling with {} workers", config.spider.max_concurrent_crawls);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, KickstarterConfig, OutputConfig, SpiderConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
