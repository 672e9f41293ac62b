//! Configuration loading and validation
//!
//! Configuration is read from a TOML file, validated, and hashed so a run
//! can record exactly which configuration produced it.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{ApiConfig, Config, CrawlerConfig, OutputConfig, SeedEntry};
pub use validation::validate;
