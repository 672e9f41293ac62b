//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the GraphStore
//! trait. Foreign keys are enforced, which is what makes the deferred
//! edge-write ordering in the crawler a hard requirement rather than a
//! convention.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{GraphStore, StoreResult};
use crate::model::{
    ContentItem, ContextAnnotation, FollowEdge, LikeEdge, QuoteEdge, ReplyEdge, RepostEdge, User,
};
use crate::MagpieError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at the given path
    pub fn new(path: &Path) -> Result<Self, MagpieError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, MagpieError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Deletes all collected data, keeping the schema
    pub fn clear(&mut self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM context_annotations;
            DELETE FROM follow_edges;
            DELETE FROM like_edges;
            DELETE FROM repost_edges;
            DELETE FROM reply_edges;
            DELETE FROM quote_edges;
            DELETE FROM content;
            DELETE FROM users;
            DELETE FROM runs;
        ",
        )?;
        Ok(())
    }
}

impl GraphStore for SqliteStore {
    fn record_run(&mut self, config_hash: &str, seed_summary: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, seeds) VALUES (?1, ?2, ?3)",
            params![now, config_hash, seed_summary],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn exists_user(&self, id: u64) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![id as i64],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert_users(&mut self, users: &[User]) -> StoreResult<()> {
        if users.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO users
                 (id, username, display_name, created_at, verified, location, profile_url, description, first_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for user in users {
                stmt.execute(params![
                    user.id as i64,
                    user.username,
                    user.display_name,
                    user.created_at.map(|t| t.to_rfc3339()),
                    user.verified,
                    user.location,
                    user.profile_url,
                    user.description,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_content(&mut self, items: &[ContentItem]) -> StoreResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO content
                 (id, author_id, text, conversation_id, created_at, language, source_query, first_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for item in items {
                stmt.execute(params![
                    item.id as i64,
                    item.author_id as i64,
                    item.text,
                    item.conversation_id.map(|c| c as i64),
                    item.created_at.map(|t| t.to_rfc3339()),
                    item.language,
                    item.source_query,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_context_annotations(
        &mut self,
        content_id: u64,
        annotations: &[ContextAnnotation],
    ) -> StoreResult<()> {
        if annotations.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO context_annotations
                 (content_id, domain_id, domain_name, entity_id, entity_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for annotation in annotations {
                stmt.execute(params![
                    content_id as i64,
                    annotation.domain_id as i64,
                    annotation.domain_name,
                    annotation.entity_id as i64,
                    annotation.entity_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_follow_edges(&mut self, edges: &[FollowEdge]) -> StoreResult<()> {
        if edges.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO follow_edges (user_id, follows_id) VALUES (?1, ?2)",
            )?;
            for edge in edges {
                stmt.execute(params![edge.user_id as i64, edge.follows_id as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_like_edges(&mut self, edges: &[LikeEdge]) -> StoreResult<()> {
        if edges.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO like_edges (user_id, content_id) VALUES (?1, ?2)",
            )?;
            for edge in edges {
                stmt.execute(params![edge.user_id as i64, edge.content_id as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_repost_edges(&mut self, edges: &[RepostEdge]) -> StoreResult<()> {
        if edges.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO repost_edges (user_id, content_id) VALUES (?1, ?2)",
            )?;
            for edge in edges {
                stmt.execute(params![edge.user_id as i64, edge.content_id as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_reply_edges(&mut self, edges: &[ReplyEdge]) -> StoreResult<()> {
        if edges.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO reply_edges (content_id, conversation_id) VALUES (?1, ?2)",
            )?;
            for edge in edges {
                stmt.execute(params![edge.content_id as i64, edge.conversation_id as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_quote_edges(&mut self, edges: &[QuoteEdge]) -> StoreResult<()> {
        if edges.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO quote_edges (content_id, quoted_content_id) VALUES (?1, ?2)",
            )?;
            for edge in edges {
                stmt.execute(params![edge.content_id as i64, edge.quoted_content_id as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn count_users(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_content(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
