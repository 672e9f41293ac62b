//! Remote graph-API interface
//!
//! The crawler core is oblivious to how the remote API is transported; it
//! sees one typed, paginated operation per task category. Every operation
//! authorizes with the credential chosen by the dispatching queue and
//! reports throttling through [`ApiError::RateLimited`] so the scheduler can
//! reschedule around the reset time.

mod http;

pub use http::HttpApi;

use crate::crawler::Credential;
use crate::model::{ContentItem, User};
use async_trait::async_trait;
use std::time::Instant;
use thiserror::Error;

/// Errors produced by remote API operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// The credential's rate-limit window is exhausted. `reset_at` is the
    /// instant the window reopens, when the response carried one.
    #[error("rate limited (reset known: {})", .reset_at.is_some())]
    RateLimited { reset_at: Option<Instant> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },
}

/// Result type for remote API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// One page of content items, with any users the response embedded
#[derive(Debug, Default)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub users: Vec<User>,
    pub next_token: Option<String>,
    pub result_count: u32,
}

/// One page of users
#[derive(Debug, Default)]
pub struct UserPage {
    pub users: Vec<User>,
    pub next_token: Option<String>,
    pub result_count: u32,
}

/// Typed paginated operations against the remote social-graph API
///
/// One method per task category. `max_results` is the page size for this
/// call; `next_token` resumes a prior page's continuation.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Recent content matching a search query (hashtag seeds)
    async fn search_recent(
        &self,
        credential: &Credential,
        query: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage>;

    /// Accounts the given user follows
    async fn following(
        &self,
        credential: &Credential,
        user_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage>;

    /// Batched user lookup by id; not paginated (callers chunk the batch)
    async fn users_by_ids(&self, credential: &Credential, ids: &[u64]) -> ApiResult<UserPage>;

    /// Content items quoting the given content item
    async fn quoting_content(
        &self,
        credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage>;

    /// Users who reposted the given content item
    async fn reposting_users(
        &self,
        credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage>;

    /// Users who liked the given content item
    async fn liking_users(
        &self,
        credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage>;

    /// Replies within the given conversation
    async fn conversation_replies(
        &self,
        credential: &Credential,
        conversation_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage>;
}
