//! Task value objects
//!
//! A task is one resumable remote-call request. Tasks are immutable:
//! pagination and rate-limit retry both construct new tasks rather than
//! mutating a queued one.

use crate::storage::{GraphStore, StoreResult};
use crate::MagpieError;
use std::fmt;
use std::sync::Arc;

/// Length of one rate-limit accounting window on the remote API (minutes)
pub const WINDOW_MINUTES: u64 = 15;

/// Maximum user ids per user-lookup call; larger batches are split into
/// sequential continuation tasks
pub const USER_BATCH_CAP: usize = 100;

/// The seven task categories, one work queue each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    HashtagSearch,
    FollowLookup,
    UserLookup,
    QuoteLookup,
    RepostLookup,
    LikeLookup,
    ReplyLookup,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::HashtagSearch,
        Category::FollowLookup,
        Category::UserLookup,
        Category::QuoteLookup,
        Category::RepostLookup,
        Category::LikeLookup,
        Category::ReplyLookup,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::HashtagSearch => "hashtag_search",
            Category::FollowLookup => "follow_lookup",
            Category::UserLookup => "user_lookup",
            Category::QuoteLookup => "quote_lookup",
            Category::RepostLookup => "repost_lookup",
            Category::LikeLookup => "like_lookup",
            Category::ReplyLookup => "reply_lookup",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Category::HashtagSearch => 0,
            Category::FollowLookup => 1,
            Category::UserLookup => 2,
            Category::QuoteLookup => 3,
            Category::RepostLookup => 4,
            Category::LikeLookup => 5,
            Category::ReplyLookup => 6,
        }
    }

    /// Upper bound on items requested per page for this category
    pub fn page_cap(self) -> u32 {
        match self {
            Category::FollowLookup => 1000,
            Category::UserLookup => USER_BATCH_CAP as u32,
            _ => 100,
        }
    }

    /// Known API ceiling: requests allowed per accounting window
    ///
    /// Used only for the remaining-time estimate in status output.
    pub fn per_window_ceiling(self) -> u64 {
        match self {
            Category::HashtagSearch => 180,
            Category::FollowLookup => 15,
            Category::UserLookup => 900,
            Category::QuoteLookup => 75,
            Category::RepostLookup => 75,
            Category::LikeLookup => 75,
            Category::ReplyLookup => 180,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dispatch priority; higher dispatches first, FIFO within a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Lowest,
    Low,
    Normal,
    High,
    Highest,
}

/// Deferred persistence work attached to a user-lookup task, run once the
/// whole batch has been looked up
pub type CompletionHook = Arc<dyn Fn(&mut dyn GraphStore) -> StoreResult<()> + Send + Sync>;

/// Category-specific task payload
#[derive(Clone)]
pub enum TaskKind {
    HashtagSearch {
        hashtag: String,
    },
    FollowLookup {
        user_id: u64,
    },
    UserLookup {
        user_ids: Vec<u64>,
        on_complete: Option<CompletionHook>,
    },
    QuoteLookup {
        content_id: u64,
    },
    RepostLookup {
        content_id: u64,
    },
    LikeLookup {
        content_id: u64,
    },
    ReplyLookup {
        conversation_id: u64,
    },
}

impl TaskKind {
    pub fn category(&self) -> Category {
        match self {
            TaskKind::HashtagSearch { .. } => Category::HashtagSearch,
            TaskKind::FollowLookup { .. } => Category::FollowLookup,
            TaskKind::UserLookup { .. } => Category::UserLookup,
            TaskKind::QuoteLookup { .. } => Category::QuoteLookup,
            TaskKind::RepostLookup { .. } => Category::RepostLookup,
            TaskKind::LikeLookup { .. } => Category::LikeLookup,
            TaskKind::ReplyLookup { .. } => Category::ReplyLookup,
        }
    }
}

impl fmt::Debug for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::HashtagSearch { hashtag } => {
                f.debug_struct("HashtagSearch").field("hashtag", hashtag).finish()
            }
            TaskKind::FollowLookup { user_id } => {
                f.debug_struct("FollowLookup").field("user_id", user_id).finish()
            }
            TaskKind::UserLookup { user_ids, on_complete } => f
                .debug_struct("UserLookup")
                .field("user_ids", &user_ids.len())
                .field("has_hook", &on_complete.is_some())
                .finish(),
            TaskKind::QuoteLookup { content_id } => {
                f.debug_struct("QuoteLookup").field("content_id", content_id).finish()
            }
            TaskKind::RepostLookup { content_id } => {
                f.debug_struct("RepostLookup").field("content_id", content_id).finish()
            }
            TaskKind::LikeLookup { content_id } => {
                f.debug_struct("LikeLookup").field("content_id", content_id).finish()
            }
            TaskKind::ReplyLookup { conversation_id } => f
                .debug_struct("ReplyLookup")
                .field("conversation_id", conversation_id)
                .finish(),
        }
    }
}

/// One unit of scheduled work: a resumable remote-call request
#[derive(Debug, Clone)]
pub struct Task {
    kind: TaskKind,
    priority: Priority,
    remaining: u32,
    next_token: Option<String>,
}

impl Task {
    /// Creates a task wanting `remaining` more result items
    ///
    /// Zero-quantity tasks are a caller bug and rejected loudly rather than
    /// silently dropped.
    pub fn new(kind: TaskKind, remaining: u32) -> Result<Self, MagpieError> {
        if remaining == 0 {
            return Err(MagpieError::InvalidTask(format!(
                "zero-quantity {} task",
                kind.category()
            )));
        }

        Ok(Self {
            kind,
            priority: Priority::Normal,
            remaining,
            next_token: None,
        })
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// A copy of this task at HIGHEST priority, for rate-limit resubmission
    pub fn escalated(&self) -> Task {
        self.clone().with_priority(Priority::Highest)
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    /// Number of items to request in this task's remote call
    pub fn page_request(&self) -> u32 {
        self.remaining.min(self.category().page_cap())
    }

    /// The continuation task for the next page, if pagination continues
    ///
    /// Pagination continues only when this page came back exactly full and
    /// more items are still wanted; a short page always ends it, even with
    /// `remaining` unexhausted.
    pub fn continuation(&self, returned: usize, next_token: Option<String>) -> Option<Task> {
        let cap = self.category().page_cap();
        if self.remaining <= cap || (returned as u32) != self.page_request() {
            return None;
        }

        Some(Task {
            kind: self.kind.clone(),
            priority: self.priority,
            remaining: self.remaining - cap,
            next_token,
        })
    }
}

/// Splits a user-lookup batch into the chunk for this call and the rest
pub fn split_user_batch(ids: &[u64]) -> (&[u64], &[u64]) {
    ids.split_at(ids.len().min(USER_BATCH_CAP))
}
