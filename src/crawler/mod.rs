//! Crawl scheduler core
//!
//! This module contains the scheduling machinery:
//! - Credential pools tracking per-credential availability
//! - Priority work queues, one per task category
//! - Scheduler loops draining each queue on its own timer
//! - The coordinator tying them together and fanning results out

mod coordinator;
mod execute;
mod pool;
mod queue;
mod scheduler;
mod task;
#[cfg(test)]
mod testing;

pub use coordinator::{Coordinator, QueueStatus};
pub use pool::{Credential, CredentialPool};
pub use queue::WorkQueue;
pub use task::{
    Category, CompletionHook, Priority, Task, TaskKind, USER_BATCH_CAP, WINDOW_MINUTES,
};

use crate::api::{ApiError, HttpApi};
use crate::config::Config;
use crate::storage::{GraphStore, SqliteStore};
use crate::{ConfigError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Runs a complete crawl until interrupted
///
/// Wires the SQLite store and HTTP API client into a coordinator, submits
/// every configured hashtag seed, and then logs queue status on an interval
/// until Ctrl-C requests shutdown. The crawl itself is open-ended; its reach
/// is bounded only by the seed counts.
pub async fn crawl(config: Config, config_hash: &str, fresh: bool) -> Result<()> {
    let mut store = SqliteStore::new(Path::new(&config.output.database_path))?;
    if fresh {
        tracing::info!("clearing previously collected data");
        store.clear()?;
    }

    let seed_summary = config
        .seeds
        .iter()
        .map(|s| format!("{}:{}", s.hashtag, s.count))
        .collect::<Vec<_>>()
        .join(",");
    let run_id = store.record_run(config_hash, &seed_summary)?;
    tracing::info!("starting crawl run {}", run_id);

    let base_url = Url::parse(&config.api.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
    let api = Arc::new(HttpApi::new(base_url).map_err(ApiError::Http)?);

    let mut coordinator = Coordinator::new(
        config.crawler.clone(),
        &config.api.bearer_tokens,
        api,
        Box::new(store),
    )?;

    for seed in &config.seeds {
        tracing::info!("seeding search for {} ({} items)", seed.hashtag, seed.count);
        coordinator.submit_hashtag_search(&seed.hashtag, seed.count)?;
    }

    coordinator.start();

    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.crawler.status_interval_secs));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                for status in coordinator.status() {
                    tracing::info!(
                        queue = %status.category,
                        size = status.size,
                        eta_minutes = status.estimated_minutes_remaining,
                        "queue status"
                    );
                }
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}
