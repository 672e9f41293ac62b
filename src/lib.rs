//! Magpie: a social-graph crawler for rate-limited APIs
//!
//! This crate implements a crawler that expands outward from hashtag seed
//! searches into users, their follow relationships, and content interactions,
//! scheduling every remote call through per-category priority queues bound to
//! pools of rate-limited credentials.

pub mod api;
pub mod config;
pub mod crawler;
pub mod model;
pub mod storage;

use thiserror::Error;

/// Main error type for magpie operations
#[derive(Debug, Error)]
pub enum MagpieError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote API error: {0}")]
    Api(#[from] api::ApiError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Credential pool constructed without credentials")]
    EmptyPool,

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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
}

/// Result type alias for magpie operations
pub type Result<T> = std::result::Result<T, MagpieError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Category, Coordinator, Priority, QueueStatus, Task};
