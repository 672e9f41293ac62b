//! Storage trait and error types

use crate::model::{
    ContentItem, ContextAnnotation, FollowEdge, LikeEdge, QuoteEdge, ReplyEdge, RepostEdge, User,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for graph persistence backends
///
/// All upserts are idempotent: rows whose primary key already exists are
/// skipped, never rewritten and never an error. Edge tables reference the
/// `users`/`content` rows they connect, so callers must persist referenced
/// entities before the edges (the crawler defers edge writes through
/// user-lookup completion hooks for exactly this reason).
pub trait GraphStore: Send {
    /// Records the start of a crawl run and returns its id
    fn record_run(&mut self, config_hash: &str, seed_summary: &str) -> StoreResult<i64>;

    /// True iff a user row with this id exists
    fn exists_user(&self, id: u64) -> StoreResult<bool>;

    fn upsert_users(&mut self, users: &[User]) -> StoreResult<()>;

    fn upsert_content(&mut self, items: &[ContentItem]) -> StoreResult<()>;

    /// Persists the topical annotations of one content item
    fn upsert_context_annotations(
        &mut self,
        content_id: u64,
        annotations: &[ContextAnnotation],
    ) -> StoreResult<()>;

    fn upsert_follow_edges(&mut self, edges: &[FollowEdge]) -> StoreResult<()>;

    fn upsert_like_edges(&mut self, edges: &[LikeEdge]) -> StoreResult<()>;

    fn upsert_repost_edges(&mut self, edges: &[RepostEdge]) -> StoreResult<()>;

    fn upsert_reply_edges(&mut self, edges: &[ReplyEdge]) -> StoreResult<()>;

    fn upsert_quote_edges(&mut self, edges: &[QuoteEdge]) -> StoreResult<()>;

    // ===== Statistics =====

    fn count_users(&self) -> StoreResult<u64>;

    fn count_content(&self) -> StoreResult<u64>;
}
