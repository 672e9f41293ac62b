use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use magpie::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Seeds: {}", config.seeds.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded with each crawl run so that collected data can be
/// traced back to the exact configuration that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r##"
[crawler]
poll-interval-ms = 5000
fanout-limit = 100

[api]
base-url = "https://api.example.com"
bearer-tokens = ["token-a", "token-b"]

[output]
database-path = "./magpie.db"

[[seeds]]
hashtag = "#rustlang"
count = 250
"##;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.poll_interval_ms, 5000);
        assert_eq!(config.api.bearer_tokens.len(), 2);
        assert_eq!(config.seeds.len(), 1);
        assert_eq!(config.seeds[0].hashtag, "#rustlang");
        assert_eq!(config.seeds[0].count, 250);
    }

    #[test]
    fn test_defaults_applied() {
        let content = r##"
[crawler]

[api]
base-url = "https://api.example.com"
bearer-tokens = ["token-a"]

[output]
database-path = "./magpie.db"

[[seeds]]
hashtag = "#x"
count = 10
"##;
        let file = create_temp_config(content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.poll_interval_ms, 5000);
        assert_eq!(config.crawler.fanout_limit, 100);
        assert_eq!(config.crawler.status_interval_secs, 60);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_without_tokens() {
        let content = r#"
[crawler]

[api]
base-url = "https://api.example.com"
bearer-tokens = []

[output]
database-path = "./magpie.db"
"#;
        let file = create_temp_config(content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
