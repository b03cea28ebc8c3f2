use crate::config::types::{Config, KickstarterConfig, SpiderConfig, UserAgentConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_spider_config(&config.spider)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(config)?;
    validate_kickstarter_config(&config.kickstarter)?;
    Ok(())
}

/// Validates worker pool and retry settings
fn validate_spider_config(config: &SpiderConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_crawls < 1 || config.max_concurrent_crawls > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_crawls must be between 1 and 100, got {}",
            config.max_concurrent_crawls
        )));
    }

    if config.max_crawl_retries > 100 {
        return Err(ConfigError::Validation(format!(
            "max_crawl_retries must be <= 100, got {}",
            config.max_crawl_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens/underscores only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, '-' and '_', got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &Config) -> Result<(), ConfigError> {
    if let Some(path) = &config.output.database_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "database_path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the Kickstarter seed and routing settings
fn validate_kickstarter_config(config: &KickstarterConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", config.base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category is required".to_string(),
        ));
    }

    if let Some(bad) = config
        .categories
        .iter()
        .find(|c| c.is_empty() || !c.chars().all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_' || ch == '/'))
    {
        return Err(ConfigError::Validation(format!(
            "Invalid category slug '{}'",
            bad
        )));
    }

    if config.sort.is_empty() {
        return Err(ConfigError::Validation("sort cannot be empty".to_string()));
    }

    Regex::new(&config.project_url_pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!(
            "Invalid project_url_pattern '{}': {}",
            config.project_url_pattern, e
        ))
    })?;

    Ok(())
}
