use serde::Deserialize;

/// Main configuration structure for magpie
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub api: ApiConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub seeds: Vec<SeedEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Idle poll interval for each scheduler loop (milliseconds)
    ///
    /// When a queue has no future credential time to wait for, its loop
    /// re-checks at this interval to pick up work fanned out from other
    /// queues.
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of items requested per derived lookup (quotes,
    /// reposts, likes, replies) when fanning out from a search result
    #[serde(rename = "fanout-limit", default = "default_fanout_limit")]
    pub fanout_limit: u32,

    /// How often queue sizes are logged (seconds)
    #[serde(rename = "status-interval-secs", default = "default_status_interval")]
    pub status_interval_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_fanout_limit() -> u32 {
    100
}

fn default_status_interval() -> u64 {
    60
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the graph API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Bearer tokens; each one is an independent rate-limit budget
    #[serde(rename = "bearer-tokens")]
    pub bearer_tokens: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A hashtag seed to start crawling from
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    /// Hashtag including the leading '#'
    pub hashtag: String,

    /// Total number of content items wanted for this hashtag
    pub count: u32,
}
