use serde::Deserialize;

/// Main configuration structure for the dspider binary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spider: SpiderConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub kickstarter: KickstarterConfig,
}

/// Worker pool and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderConfig {
    /// Number of concurrent crawl workers
    #[serde(rename = "max-concurrent-crawls", default = "default_max_concurrent_crawls")]
    pub max_concurrent_crawls: usize,

    /// Retries after a failed fetch
    #[serde(rename = "max-crawl-retries", default = "default_max_crawl_retries")]
    pub max_crawl_retries: u32,

    /// Delay between fetch attempts (milliseconds)
    #[serde(rename = "crawl-retry-interval-ms", default = "default_crawl_retry_interval_ms")]
    pub crawl_retry_interval_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file; a dated file name when absent
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

/// Kickstarter discover-API crawl configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KickstarterConfig {
    /// Site root, without a trailing slash
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Category slugs to crawl, one seed URL each
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Sort order passed to the discover API
    #[serde(default = "default_sort")]
    pub sort: String,

    /// Pattern routing project URLs to the SQLite storage
    #[serde(rename = "project-url-pattern", default = "default_project_url_pattern")]
    pub project_url_pattern: String,
}

fn default_max_concurrent_crawls() -> usize {
    2
}

fn default_max_crawl_retries() -> u32 {
    3
}

fn default_crawl_retry_interval_ms() -> u64 {
    3000
}

fn default_crawler_name() -> String {
    "dspider".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://github.com/yijinliu/dspider".to_string()
}

fn default_base_url() -> String {
    "http://www.kickstarter.com".to_string()
}

fn default_categories() -> Vec<String> {
    vec![
        "technology".to_string(),
        "crafts".to_string(),
        "design".to_string(),
    ]
}

fn default_sort() -> String {
    "end_date".to_string()
}

fn default_project_url_pattern() -> String {
    "^https://www[.]kickstarter[.]com/projects/".to_string()
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_crawls: default_max_concurrent_crawls(),
            max_crawl_retries: default_max_crawl_retries(),
            crawl_retry_interval_ms: default_crawl_retry_interval_ms(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
        }
    }
}

impl Default for KickstarterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            categories: default_categories(),
            sort: default_sort(),
            project_url_pattern: default_project_url_pattern(),
        }
    }
}
