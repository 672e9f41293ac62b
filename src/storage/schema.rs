//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the magpie database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    seeds TEXT NOT NULL
);

-- Discovered accounts
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL,
    display_name TEXT NOT NULL,
    created_at TEXT,
    verified INTEGER NOT NULL DEFAULT 0,
    location TEXT,
    profile_url TEXT,
    description TEXT,
    first_seen_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);

-- Discovered content items
CREATE TABLE IF NOT EXISTS content (
    id INTEGER PRIMARY KEY,
    author_id INTEGER NOT NULL REFERENCES users(id),
    text TEXT NOT NULL,
    conversation_id INTEGER,
    created_at TEXT,
    language TEXT,
    source_query TEXT,
    first_seen_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_content_author ON content(author_id);
CREATE INDEX IF NOT EXISTS idx_content_conversation ON content(conversation_id);

-- Topical annotations attached to content by the remote API
CREATE TABLE IF NOT EXISTS context_annotations (
    content_id INTEGER NOT NULL REFERENCES content(id),
    domain_id INTEGER NOT NULL,
    domain_name TEXT NOT NULL,
    entity_id INTEGER NOT NULL,
    entity_name TEXT NOT NULL,
    PRIMARY KEY (content_id, domain_id, entity_id)
);

-- user_id follows follows_id
CREATE TABLE IF NOT EXISTS follow_edges (
    user_id INTEGER NOT NULL REFERENCES users(id),
    follows_id INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (user_id, follows_id)
);

-- user_id liked content_id
CREATE TABLE IF NOT EXISTS like_edges (
    user_id INTEGER NOT NULL REFERENCES users(id),
    content_id INTEGER NOT NULL REFERENCES content(id),
    PRIMARY KEY (user_id, content_id)
);

-- user_id reposted content_id
CREATE TABLE IF NOT EXISTS repost_edges (
    user_id INTEGER NOT NULL REFERENCES users(id),
    content_id INTEGER NOT NULL REFERENCES content(id),
    PRIMARY KEY (user_id, content_id)
);

-- content_id is a reply within conversation_id
CREATE TABLE IF NOT EXISTS reply_edges (
    content_id INTEGER NOT NULL REFERENCES content(id),
    conversation_id INTEGER NOT NULL,
    PRIMARY KEY (content_id, conversation_id)
);

-- content_id quotes quoted_content_id
CREATE TABLE IF NOT EXISTS quote_edges (
    content_id INTEGER NOT NULL REFERENCES content(id),
    quoted_content_id INTEGER NOT NULL,
    PRIMARY KEY (content_id, quoted_content_id)
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = vec![
            "runs",
            "users",
            "content",
            "context_annotations",
            "follow_edges",
            "like_edges",
            "repost_edges",
            "reply_edges",
            "quote_edges",
        ];

        for table in tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
