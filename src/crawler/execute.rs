//! Task execution and result fan-out
//!
//! Execution is a two-phase protocol. Phase one performs the remote call
//! and decides whether a continuation task is needed; phase two persists the
//! returned entities and submits derived work into other queues. Throttling
//! short-circuits both phases: the escalated resubmission takes over.
//!
//! Failures here never abort the crawl. A dropped task is acceptable because
//! the crawl is open-ended; the same entity tends to be rediscovered through
//! another path.

use crate::api::ApiError;
use crate::crawler::coordinator::Shared;
use crate::crawler::pool::Credential;
use crate::crawler::task::{split_user_batch, CompletionHook, Task, TaskKind};
use crate::model::{FollowEdge, LikeEdge, QuoteEdge, ReplyEdge, RepostEdge, User};
use crate::storage::{GraphStore, StoreResult};
use std::sync::Arc;

pub(crate) async fn execute_task(shared: &Shared, task: Task, credential: &Credential) {
    match task.kind().clone() {
        TaskKind::HashtagSearch { hashtag } => {
            hashtag_search(shared, &task, &hashtag, credential).await
        }
        TaskKind::FollowLookup { user_id } => {
            follow_lookup(shared, &task, user_id, credential).await
        }
        TaskKind::UserLookup {
            user_ids,
            on_complete,
        } => user_lookup(shared, &task, &user_ids, on_complete, credential).await,
        TaskKind::QuoteLookup { content_id } => {
            quote_lookup(shared, &task, content_id, credential).await
        }
        TaskKind::RepostLookup { content_id } => {
            repost_lookup(shared, &task, content_id, credential).await
        }
        TaskKind::LikeLookup { content_id } => {
            like_lookup(shared, &task, content_id, credential).await
        }
        TaskKind::ReplyLookup { conversation_id } => {
            reply_lookup(shared, &task, conversation_id, credential).await
        }
    }
}

async fn hashtag_search(shared: &Shared, task: &Task, hashtag: &str, credential: &Credential) {
    let result = shared
        .api
        .search_recent(credential, hashtag, task.page_request(), task.next_token())
        .await;

    let page = match result {
        Ok(page) => page,
        Err(err) => return handle_failure(shared, task, credential, err),
    };

    if let Some(next) = task.continuation(page.items.len(), page.next_token.clone()) {
        shared.submit(next);
    }

    // Which authors are new has to be decided before they are persisted
    let fresh_user_ids = unknown_user_ids(shared, &page.users);

    with_store(shared, "hashtag search result", |store| {
        store.upsert_users(&page.users)?;
        store.upsert_content(&page.items)?;
        for item in &page.items {
            store.upsert_context_annotations(item.id, &item.annotations)?;
        }
        Ok(())
    });

    let fanout = shared.config.fanout_limit;
    for user_id in fresh_user_ids {
        submit_or_log(shared.submit_follow_lookup(user_id), "follow lookup");
    }
    for item in &page.items {
        if let Some(conversation_id) = item.conversation_id {
            submit_or_log(
                shared.submit_reply_lookup(conversation_id, fanout),
                "reply lookup",
            );
        }
        submit_or_log(shared.submit_quote_lookup(item.id, fanout), "quote lookup");
        submit_or_log(shared.submit_repost_lookup(item.id, fanout), "repost lookup");
        submit_or_log(shared.submit_like_lookup(item.id, fanout), "like lookup");
    }
}

async fn follow_lookup(shared: &Shared, task: &Task, user_id: u64, credential: &Credential) {
    let result = shared
        .api
        .following(credential, user_id, task.page_request(), task.next_token())
        .await;

    let page = match result {
        Ok(page) => page,
        Err(err) => return handle_failure(shared, task, credential, err),
    };

    if let Some(next) = task.continuation(page.users.len(), page.next_token.clone()) {
        shared.submit(next);
    }

    let followed: Vec<u64> = page.users.iter().map(|u| u.id).collect();
    if followed.is_empty() {
        return;
    }

    // The follow edges reference users that may not exist yet; they are
    // written by the user lookup's completion hook once the rows do.
    let edges: Vec<FollowEdge> = followed
        .iter()
        .map(|&follows_id| FollowEdge { user_id, follows_id })
        .collect();
    let hook: CompletionHook =
        Arc::new(move |store: &mut dyn GraphStore| store.upsert_follow_edges(&edges));

    submit_or_log(
        shared.submit_user_lookup(followed, Some(hook)),
        "user lookup",
    );
}

async fn user_lookup(
    shared: &Shared,
    task: &Task,
    user_ids: &[u64],
    on_complete: Option<CompletionHook>,
    credential: &Credential,
) {
    let (chunk, rest) = split_user_batch(user_ids);

    let result = shared.api.users_by_ids(credential, chunk).await;
    let page = match result {
        Ok(page) => page,
        Err(err) => return handle_failure(shared, task, credential, err),
    };

    with_store(shared, "user lookup result", |store| {
        store.upsert_users(&page.users)
    });

    // Terminal category: no lookups-of-lookups, only the batch continuation
    if !rest.is_empty() && page.users.len() == chunk.len() {
        let continuation = Task::new(
            TaskKind::UserLookup {
                user_ids: rest.to_vec(),
                on_complete,
            },
            rest.len() as u32,
        );
        match continuation {
            Ok(next) => shared.submit(next.with_priority(task.priority())),
            Err(err) => tracing::error!("failed to build user-lookup continuation: {}", err),
        }
    } else if let Some(hook) = on_complete {
        with_store(shared, "deferred edge write", |store| hook(store));
    }
}

async fn quote_lookup(shared: &Shared, task: &Task, content_id: u64, credential: &Credential) {
    let result = shared
        .api
        .quoting_content(credential, content_id, task.page_request(), task.next_token())
        .await;

    let page = match result {
        Ok(page) => page,
        Err(err) => return handle_failure(shared, task, credential, err),
    };

    if let Some(next) = task.continuation(page.items.len(), page.next_token.clone()) {
        shared.submit(next);
    }

    let edges: Vec<QuoteEdge> = page
        .items
        .iter()
        .map(|item| QuoteEdge {
            content_id: item.id,
            quoted_content_id: content_id,
        })
        .collect();

    with_store(shared, "quote lookup result", |store| {
        store.upsert_users(&page.users)?;
        store.upsert_content(&page.items)?;
        for item in &page.items {
            store.upsert_context_annotations(item.id, &item.annotations)?;
        }
        store.upsert_quote_edges(&edges)
    });
}

async fn repost_lookup(shared: &Shared, task: &Task, content_id: u64, credential: &Credential) {
    let result = shared
        .api
        .reposting_users(credential, content_id, task.page_request(), task.next_token())
        .await;

    let page = match result {
        Ok(page) => page,
        Err(err) => return handle_failure(shared, task, credential, err),
    };

    if let Some(next) = task.continuation(page.users.len(), page.next_token.clone()) {
        shared.submit(next);
    }

    defer_interaction_edges(shared, &page.users, move |user_ids| {
        let edges: Vec<RepostEdge> = user_ids
            .iter()
            .map(|&user_id| RepostEdge { user_id, content_id })
            .collect();
        let hook: CompletionHook =
            Arc::new(move |store: &mut dyn GraphStore| store.upsert_repost_edges(&edges));
        hook
    });
}

async fn like_lookup(shared: &Shared, task: &Task, content_id: u64, credential: &Credential) {
    let result = shared
        .api
        .liking_users(credential, content_id, task.page_request(), task.next_token())
        .await;

    let page = match result {
        Ok(page) => page,
        Err(err) => return handle_failure(shared, task, credential, err),
    };

    if let Some(next) = task.continuation(page.users.len(), page.next_token.clone()) {
        shared.submit(next);
    }

    defer_interaction_edges(shared, &page.users, move |user_ids| {
        let edges: Vec<LikeEdge> = user_ids
            .iter()
            .map(|&user_id| LikeEdge { user_id, content_id })
            .collect();
        let hook: CompletionHook =
            Arc::new(move |store: &mut dyn GraphStore| store.upsert_like_edges(&edges));
        hook
    });
}

async fn reply_lookup(shared: &Shared, task: &Task, conversation_id: u64, credential: &Credential) {
    let result = shared
        .api
        .conversation_replies(credential, conversation_id, task.page_request(), task.next_token())
        .await;

    let page = match result {
        Ok(page) => page,
        Err(err) => return handle_failure(shared, task, credential, err),
    };

    if let Some(next) = task.continuation(page.items.len(), page.next_token.clone()) {
        shared.submit(next);
    }

    let edges: Vec<ReplyEdge> = page
        .items
        .iter()
        .map(|item| ReplyEdge {
            content_id: item.id,
            conversation_id,
        })
        .collect();

    with_store(shared, "reply lookup result", |store| {
        store.upsert_users(&page.users)?;
        store.upsert_content(&page.items)?;
        for item in &page.items {
            store.upsert_context_annotations(item.id, &item.annotations)?;
        }
        store.upsert_reply_edges(&edges)
    });
}

/// Routes interacting users through a deduplicated user lookup, attaching
/// the edge write as the lookup's completion hook
fn defer_interaction_edges<F>(shared: &Shared, users: &[User], make_hook: F)
where
    F: FnOnce(&[u64]) -> CompletionHook,
{
    let user_ids: Vec<u64> = users.iter().map(|u| u.id).collect();
    if user_ids.is_empty() {
        return;
    }

    let hook = make_hook(&user_ids);
    submit_or_log(
        shared.submit_user_lookup(user_ids, Some(hook)),
        "user lookup",
    );
}

/// Phase-one failure handling per the error taxonomy
fn handle_failure(shared: &Shared, task: &Task, credential: &Credential, err: ApiError) {
    match err {
        ApiError::RateLimited {
            reset_at: Some(reset_at),
        } => shared.report_rate_limited(task, credential, reset_at),
        ApiError::RateLimited { reset_at: None } => {
            // Retrying a throttle we cannot time out would spin; dropping is
            // safer and the condition itself is a defect signal
            tracing::error!(
                category = %task.category(),
                "throttled without a usable reset time; dropping task"
            );
        }
        other => {
            tracing::warn!(
                category = %task.category(),
                "remote call failed, dropping task: {}",
                other
            );
        }
    }
}

fn unknown_user_ids(shared: &Shared, users: &[User]) -> Vec<u64> {
    let store = shared.store.lock().unwrap();
    users
        .iter()
        .map(|u| u.id)
        .filter(|&id| match store.exists_user(id) {
            Ok(exists) => !exists,
            Err(err) => {
                tracing::warn!("existence check for user {} failed: {}", id, err);
                true
            }
        })
        .collect()
}

fn with_store<F>(shared: &Shared, context: &str, f: F)
where
    F: FnOnce(&mut dyn GraphStore) -> StoreResult<()>,
{
    let mut store = shared.store.lock().unwrap();
    if let Err(err) = f(&mut **store) {
        tracing::error!("persistence failure in {}: {}", context, err);
    }
}

fn submit_or_log(result: crate::Result<()>, what: &str) {
    if let Err(err) = result {
        tracing::error!("failed to submit {}: {}", what, err);
    }
}
