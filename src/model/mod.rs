//! Persisted entity types
//!
//! These are the value types shared between the remote API layer (which
//! produces them from response pages) and the store (which persists them).
//! Identifiers are numeric; the wire layer converts from the API's string
//! encoding.

use chrono::{DateTime, Utc};

/// A discovered account on the social graph
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub display_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub verified: bool,
    pub location: Option<String>,
    pub profile_url: Option<String>,
    pub description: Option<String>,
}

/// A discovered content item (post)
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: u64,
    pub author_id: u64,
    pub text: String,
    /// Conversation this item belongs to; the root item of a thread carries
    /// its own id here
    pub conversation_id: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    /// The search query that surfaced this item, if any
    pub source_query: Option<String>,
    pub annotations: Vec<ContextAnnotation>,
}

/// A topical annotation attached to a content item by the remote API
#[derive(Debug, Clone, PartialEq)]
pub struct ContextAnnotation {
    pub domain_id: u64,
    pub domain_name: String,
    pub entity_id: u64,
    pub entity_name: String,
}

/// user_id follows follows_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowEdge {
    pub user_id: u64,
    pub follows_id: u64,
}

/// user_id liked content_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeEdge {
    pub user_id: u64,
    pub content_id: u64,
}

/// user_id reposted content_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepostEdge {
    pub user_id: u64,
    pub content_id: u64,
}

/// content_id is a reply within conversation_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyEdge {
    pub content_id: u64,
    pub conversation_id: u64,
}

/// content_id quotes quoted_content_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteEdge {
    pub content_id: u64,
    pub quoted_content_id: u64,
}
