use crate::config::types::{ApiConfig, Config, CrawlerConfig, SeedEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be >= 100ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.fanout_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "fanout_limit must be >= 1, got {}",
            config.fanout_limit
        )));
    }

    if config.status_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "status_interval_secs must be >= 1, got {}",
            config.status_interval_secs
        )));
    }

    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base_url must be an http(s) URL, got '{}'",
            config.base_url
        )));
    }

    if config.bearer_tokens.is_empty() {
        return Err(ConfigError::Validation(
            "at least one bearer token is required".to_string(),
        ));
    }

    if config.bearer_tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "bearer tokens cannot be empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed entries
fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    for seed in seeds {
        if !seed.hashtag.starts_with('#') || seed.hashtag.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "Seed hashtag '{}' must start with '#' and name a tag",
                seed.hashtag
            )));
        }

        if seed.count == 0 {
            return Err(ConfigError::Validation(format!(
                "Seed '{}' must request at least one item",
                seed.hashtag
            )));
        }
    }

    Ok(())
}
