//! Shared test doubles for the crawler core

use crate::api::{ApiError, ApiResult, ContentPage, GraphApi, UserPage};
use crate::crawler::pool::Credential;
use crate::crawler::task::Category;
use crate::model::{
    ContentItem, ContextAnnotation, FollowEdge, LikeEdge, QuoteEdge, ReplyEdge, RepostEdge, User,
};
use crate::storage::{GraphStore, StoreResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub(crate) fn make_user(id: u64) -> User {
    User {
        id,
        username: format!("user{}", id),
        display_name: format!("User {}", id),
        created_at: None,
        verified: false,
        location: None,
        profile_url: None,
        description: None,
    }
}

pub(crate) fn make_content(id: u64, author_id: u64) -> ContentItem {
    ContentItem {
        id,
        author_id,
        text: format!("content {}", id),
        conversation_id: Some(id),
        created_at: None,
        language: Some("en".to_string()),
        source_query: None,
        annotations: vec![],
    }
}

/// A content page of `count` items by one author, ids starting at `first_id`
pub(crate) fn content_page(first_id: u64, count: usize, next_token: Option<&str>) -> ContentPage {
    let author = make_user(1);
    let items: Vec<ContentItem> = (0..count as u64)
        .map(|offset| make_content(first_id + offset, author.id))
        .collect();
    ContentPage {
        result_count: items.len() as u32,
        users: vec![author],
        next_token: next_token.map(str::to_string),
        items,
    }
}

/// A user page with the given ids
pub(crate) fn user_page(ids: &[u64], next_token: Option<&str>) -> UserPage {
    UserPage {
        users: ids.iter().map(|&id| make_user(id)).collect(),
        next_token: next_token.map(str::to_string),
        result_count: ids.len() as u32,
    }
}

/// One scripted remote response
pub(crate) enum Scripted {
    Content(ContentPage),
    Users(UserPage),
    RateLimited { reset_at: Option<Instant> },
    ServerError,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub category: Category,
    pub max_results: u32,
    pub next_token: Option<String>,
    pub ids: Vec<u64>,
}

/// Scripted in-memory GraphApi
///
/// Responses are queued per category and consumed in order; a category with
/// no scripted response left answers with an empty page.
pub(crate) struct FakeApi {
    scripts: Mutex<HashMap<Category, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, category: Category, response: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(category)
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, category: Category, max_results: u32, next_token: Option<&str>, ids: &[u64]) {
        self.calls.lock().unwrap().push(RecordedCall {
            category,
            max_results,
            next_token: next_token.map(str::to_string),
            ids: ids.to_vec(),
        });
    }

    fn pop(&self, category: Category) -> Option<Scripted> {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&category)
            .and_then(|queue| queue.pop_front())
    }

    fn content_response(
        &self,
        category: Category,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage> {
        self.record(category, max_results, next_token, &[]);
        match self.pop(category) {
            None => Ok(ContentPage::default()),
            Some(Scripted::Content(page)) => Ok(page),
            Some(Scripted::Users(_)) => panic!("user page scripted for content category"),
            Some(Scripted::RateLimited { reset_at }) => Err(ApiError::RateLimited { reset_at }),
            Some(Scripted::ServerError) => Err(ApiError::Status {
                endpoint: "fake".to_string(),
                status: 500,
            }),
        }
    }

    fn user_response(
        &self,
        category: Category,
        max_results: u32,
        next_token: Option<&str>,
        ids: &[u64],
    ) -> ApiResult<UserPage> {
        self.record(category, max_results, next_token, ids);
        match self.pop(category) {
            None => Ok(UserPage::default()),
            Some(Scripted::Users(page)) => Ok(page),
            Some(Scripted::Content(_)) => panic!("content page scripted for user category"),
            Some(Scripted::RateLimited { reset_at }) => Err(ApiError::RateLimited { reset_at }),
            Some(Scripted::ServerError) => Err(ApiError::Status {
                endpoint: "fake".to_string(),
                status: 500,
            }),
        }
    }
}

#[async_trait]
impl GraphApi for FakeApi {
    async fn search_recent(
        &self,
        _credential: &Credential,
        _query: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage> {
        self.content_response(Category::HashtagSearch, max_results, next_token)
    }

    async fn following(
        &self,
        _credential: &Credential,
        user_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage> {
        self.user_response(Category::FollowLookup, max_results, next_token, &[user_id])
    }

    async fn users_by_ids(&self, _credential: &Credential, ids: &[u64]) -> ApiResult<UserPage> {
        self.user_response(Category::UserLookup, ids.len() as u32, None, ids)
    }

    async fn quoting_content(
        &self,
        _credential: &Credential,
        _content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage> {
        self.content_response(Category::QuoteLookup, max_results, next_token)
    }

    async fn reposting_users(
        &self,
        _credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage> {
        self.user_response(Category::RepostLookup, max_results, next_token, &[content_id])
    }

    async fn liking_users(
        &self,
        _credential: &Credential,
        content_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<UserPage> {
        self.user_response(Category::LikeLookup, max_results, next_token, &[content_id])
    }

    async fn conversation_replies(
        &self,
        _credential: &Credential,
        _conversation_id: u64,
        max_results: u32,
        next_token: Option<&str>,
    ) -> ApiResult<ContentPage> {
        self.content_response(Category::ReplyLookup, max_results, next_token)
    }
}

/// Everything a RecordingStore has been asked to persist
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub users: BTreeMap<u64, User>,
    pub content: BTreeMap<u64, ContentItem>,
    pub annotations: Vec<(u64, ContextAnnotation)>,
    pub follow_edges: Vec<FollowEdge>,
    pub like_edges: Vec<LikeEdge>,
    pub repost_edges: Vec<RepostEdge>,
    pub reply_edges: Vec<ReplyEdge>,
    pub quote_edges: Vec<QuoteEdge>,
    pub runs: Vec<(String, String)>,
}

/// In-memory GraphStore with insert-or-ignore semantics and shared,
/// inspectable state
pub(crate) struct RecordingStore(pub Arc<Mutex<StoreState>>);

impl RecordingStore {
    pub fn new() -> (Self, Arc<Mutex<StoreState>>) {
        let state = Arc::new(Mutex::new(StoreState::default()));
        (Self(Arc::clone(&state)), state)
    }
}

impl GraphStore for RecordingStore {
    fn record_run(&mut self, config_hash: &str, seed_summary: &str) -> StoreResult<i64> {
        let mut state = self.0.lock().unwrap();
        state
            .runs
            .push((config_hash.to_string(), seed_summary.to_string()));
        Ok(state.runs.len() as i64)
    }

    fn exists_user(&self, id: u64) -> StoreResult<bool> {
        Ok(self.0.lock().unwrap().users.contains_key(&id))
    }

    fn upsert_users(&mut self, users: &[User]) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for user in users {
            state.users.entry(user.id).or_insert_with(|| user.clone());
        }
        Ok(())
    }

    fn upsert_content(&mut self, items: &[ContentItem]) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for item in items {
            state.content.entry(item.id).or_insert_with(|| item.clone());
        }
        Ok(())
    }

    fn upsert_context_annotations(
        &mut self,
        content_id: u64,
        annotations: &[ContextAnnotation],
    ) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for annotation in annotations {
            let row = (content_id, annotation.clone());
            if !state.annotations.contains(&row) {
                state.annotations.push(row);
            }
        }
        Ok(())
    }

    fn upsert_follow_edges(&mut self, edges: &[FollowEdge]) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for &edge in edges {
            if !state.follow_edges.contains(&edge) {
                state.follow_edges.push(edge);
            }
        }
        Ok(())
    }

    fn upsert_like_edges(&mut self, edges: &[LikeEdge]) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for &edge in edges {
            if !state.like_edges.contains(&edge) {
                state.like_edges.push(edge);
            }
        }
        Ok(())
    }

    fn upsert_repost_edges(&mut self, edges: &[RepostEdge]) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for &edge in edges {
            if !state.repost_edges.contains(&edge) {
                state.repost_edges.push(edge);
            }
        }
        Ok(())
    }

    fn upsert_reply_edges(&mut self, edges: &[ReplyEdge]) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for &edge in edges {
            if !state.reply_edges.contains(&edge) {
                state.reply_edges.push(edge);
            }
        }
        Ok(())
    }

    fn upsert_quote_edges(&mut self, edges: &[QuoteEdge]) -> StoreResult<()> {
        let mut state = self.0.lock().unwrap();
        for &edge in edges {
            if !state.quote_edges.contains(&edge) {
                state.quote_edges.push(edge);
            }
        }
        Ok(())
    }

    fn count_users(&self) -> StoreResult<u64> {
        Ok(self.0.lock().unwrap().users.len() as u64)
    }

    fn count_content(&self) -> StoreResult<u64> {
        Ok(self.0.lock().unwrap().content.len() as u64)
    }
}
