//! HTTP implementation of the graph API
//!
//! JSON binding: every operation is a GET returning
//! `{data: [...], includes: {users: [...]}, meta: {result_count, next_token}}`.
//! HTTP 429 maps to [`ApiError::RateLimited`], with the reset instant taken
//! from the `x-rate-limit-reset` header (epoch seconds) when present.

use crate::api::{ApiError, ApiResult, ContentPage, GraphApi, UserPage};
use crate::crawler::Credential;
use crate::model::{ContentItem, ContextAnnotation, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use url::Url;

/// Filters appended to hashtag searches so seeds surface original posts only
const SEARCH_FILTER_SUFFIX: &str = "-is:repost -is:reply -is:quote lang:en";

/// HTTP client for the remote graph API
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    /// Creates a new API client against the given base URL
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("magpie/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        credential: &Credential,
        path: &str,
        params: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Malformed {
                endpoint: path.to_string(),
                message: format!("bad endpoint URL: {}", e),
            })?;

        let response = self
            .client
            .get(url)
            .bearer_auth(credential.bearer())
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited {
                reset_at: reset_instant(response.headers()),
            });
        }

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| ApiError::Malformed {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn search(
        &self,
        credential: &Credential,
        query: String,
        max_results: u32,
        next_token: Option<&str>,
        source_query: Option<&str>,
    ) -> ApiResult<ContentPage> {
        let path = "2/content/search/recent";
        let mut params = vec![
            ("query", query),
            ("max_results", max_results.to_string()),
        ];
        if let Some(token) = next_token {
            params.push(("next_token", token.to_string()));
        }

        let envelope: ContentEnvelope = self.get_json(credential, path, &params).await?;
        envelope.into_page(path, source_query)
    }

    async fn user_listing(
        &self,
        credential: &Credential,
        path: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage> {
        let mut params = vec![("max_results", max_results.to_string())];
        if let Some(token) = next_token {
            params.push(("pagination_token", token.to_string()));
        }

        let envelope: UserEnvelope = self.get_json(credential, path, &params).await?;
        envelope.into_page(path)
    }
}

#[async_trait]
impl GraphApi for HttpApi {
    async fn search_recent(
        &self,
        credential: &Credential,
        query: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage> {
        let full_query = format!("{} {}", query, SEARCH_FILTER_SUFFIX);
        self.search(credential, full_query, max_results, next_token, Some(query))
            .await
    }

    async fn following(
        &self,
        credential: &Credential,
        user_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage> {
        let path = format!("2/users/{}/following", user_id);
        self.user_listing(credential, &path, max_results, next_token)
            .await
    }

    async fn users_by_ids(&self, credential: &Credential, ids: &[u64]) -> ApiResult<UserPage> {
        let path = "2/users";
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let params = vec![("ids", joined)];

        let envelope: UserEnvelope = self.get_json(credential, path, &params).await?;
        envelope.into_page(path)
    }

    async fn quoting_content(
        &self,
        credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage> {
        let path = format!("2/content/{}/quotes", content_id);
        let mut params = vec![("max_results", max_results.to_string())];
        if let Some(token) = next_token {
            params.push(("pagination_token", token.to_string()));
        }

        let envelope: ContentEnvelope = self.get_json(credential, &path, &params).await?;
        envelope.into_page(&path, None)
    }

    async fn reposting_users(
        &self,
        credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage> {
        let path = format!("2/content/{}/reposted_by", content_id);
        self.user_listing(credential, &path, max_results, next_token)
            .await
    }

    async fn liking_users(
        &self,
        credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage> {
        let path = format!("2/content/{}/liking_users", content_id);
        self.user_listing(credential, &path, max_results, next_token)
            .await
    }

    async fn conversation_replies(
        &self,
        credential: &Credential,
        conversation_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage> {
        let query = format!("conversation_id:{}", conversation_id);
        self.search(credential, query, max_results, next_token, None)
            .await
    }
}

/// Extracts the rate-limit reset instant from response headers
///
/// The header carries epoch seconds; a reset already in the past collapses
/// to "now" so the credential becomes usable again immediately.
fn reset_instant(headers: &HeaderMap) -> Option<Instant> {
    let reset_epoch = headers
        .get("x-rate-limit-reset")?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;

    let now_epoch = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let reset = Duration::from_secs(reset_epoch);

    if reset > now_epoch {
        Some(Instant::now() + (reset - now_epoch))
    } else {
        Some(Instant::now())
    }
}

// ===== Wire types =====

#[derive(Debug, Deserialize)]
struct Meta {
    result_count: Option<u32>,
    next_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    #[serde(default)]
    data: Vec<WireContent>,
    #[serde(default)]
    includes: Includes,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    #[serde(default)]
    data: Vec<WireUser>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
    name: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    verified: bool,
    location: Option<String>,
    url: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    id: String,
    author_id: Option<String>,
    text: String,
    conversation_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    lang: Option<String>,
    #[serde(default)]
    context_annotations: Vec<WireAnnotation>,
}

#[derive(Debug, Deserialize)]
struct WireAnnotation {
    domain: WireAnnotationPart,
    entity: WireAnnotationPart,
}

#[derive(Debug, Deserialize)]
struct WireAnnotationPart {
    id: String,
    name: Option<String>,
}

fn parse_id(raw: &str, endpoint: &str) -> ApiResult<u64> {
    raw.parse::<u64>().map_err(|_| ApiError::Malformed {
        endpoint: endpoint.to_string(),
        message: format!("non-numeric id '{}'", raw),
    })
}

impl WireUser {
    fn into_user(self, endpoint: &str) -> ApiResult<User> {
        Ok(User {
            id: parse_id(&self.id, endpoint)?,
            username: self.username,
            display_name: self.name,
            created_at: self.created_at,
            verified: self.verified,
            location: self.location,
            profile_url: self.url,
            description: self.description,
        })
    }
}

impl WireContent {
    fn into_item(self, endpoint: &str, source_query: Option<&str>) -> ApiResult<ContentItem> {
        let author_id = self.author_id.ok_or_else(|| ApiError::Malformed {
            endpoint: endpoint.to_string(),
            message: format!("content item {} missing author_id", self.id),
        })?;

        let annotations = self
            .context_annotations
            .into_iter()
            .map(|a| {
                Ok(ContextAnnotation {
                    domain_id: parse_id(&a.domain.id, endpoint)?,
                    domain_name: a.domain.name.unwrap_or_default(),
                    entity_id: parse_id(&a.entity.id, endpoint)?,
                    entity_name: a.entity.name.unwrap_or_default(),
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(ContentItem {
            id: parse_id(&self.id, endpoint)?,
            author_id: parse_id(&author_id, endpoint)?,
            text: self.text,
            conversation_id: self
                .conversation_id
                .as_deref()
                .map(|c| parse_id(c, endpoint))
                .transpose()?,
            created_at: self.created_at,
            language: self.lang,
            source_query: source_query.map(str::to_string),
            annotations,
        })
    }
}

impl ContentEnvelope {
    fn into_page(self, endpoint: &str, source_query: Option<&str>) -> ApiResult<ContentPage> {
        let items = self
            .data
            .into_iter()
            .map(|c| c.into_item(endpoint, source_query))
            .collect::<ApiResult<Vec<_>>>()?;

        let users = self
            .includes
            .users
            .into_iter()
            .map(|u| u.into_user(endpoint))
            .collect::<ApiResult<Vec<_>>>()?;

        let (result_count, next_token) = meta_fields(self.meta, items.len());

        Ok(ContentPage {
            items,
            users,
            next_token,
            result_count,
        })
    }
}

impl UserEnvelope {
    fn into_page(self, endpoint: &str) -> ApiResult<UserPage> {
        let users = self
            .data
            .into_iter()
            .map(|u| u.into_user(endpoint))
            .collect::<ApiResult<Vec<_>>>()?;

        let (result_count, next_token) = meta_fields(self.meta, users.len());

        Ok(UserPage {
            users,
            next_token,
            result_count,
        })
    }
}

fn meta_fields(meta: Option<Meta>, item_count: usize) -> (u32, Option<String>) {
    match meta {
        Some(meta) => (
            meta.result_count.unwrap_or(item_count as u32),
            meta.next_token,
        ),
        None => (item_count as u32, None),
    }
}
