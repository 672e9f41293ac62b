//! Crawl coordinator
//!
//! Owns the seven (queue, scheduler loop) pairs, routes rate-limit reports
//! back to the right queue, and exposes the task-submission surface. The
//! coordinator is an explicitly constructed value: credentials, the remote
//! API and the store are injected, which keeps the whole machine testable
//! with fakes.

use crate::api::GraphApi;
use crate::config::CrawlerConfig;
use crate::crawler::pool::{Credential, CredentialPool};
use crate::crawler::queue::WorkQueue;
use crate::crawler::scheduler;
use crate::crawler::task::{
    Category, CompletionHook, Task, TaskKind, WINDOW_MINUTES,
};
use crate::storage::GraphStore;
use crate::Result;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Observability snapshot for one queue
#[derive(Debug, Clone, Copy)]
pub struct QueueStatus {
    pub category: Category,
    pub size: usize,
    /// `ceil(size / per-window ceiling) * window minutes`; a derived metric
    /// for operators, never used for scheduling
    pub estimated_minutes_remaining: u64,
}

/// State shared between the coordinator handle and its scheduler loops
pub(crate) struct Shared {
    queues: Vec<Arc<WorkQueue>>,
    pub(crate) api: Arc<dyn GraphApi>,
    pub(crate) store: Mutex<Box<dyn GraphStore>>,
    pub(crate) config: CrawlerConfig,
    pub(crate) stop_rx: watch::Receiver<bool>,
}

impl Shared {
    pub(crate) fn queue(&self, category: Category) -> &Arc<WorkQueue> {
        &self.queues[category.index()]
    }

    pub(crate) fn stopping(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Routes a task into its category's queue
    pub(crate) fn submit(&self, task: Task) {
        self.queue(task.category()).submit(task);
    }

    pub(crate) fn submit_hashtag_search(&self, hashtag: &str, count: u32) -> Result<()> {
        let task = Task::new(
            TaskKind::HashtagSearch {
                hashtag: hashtag.to_string(),
            },
            count,
        )?;
        self.submit(task);
        Ok(())
    }

    /// Follow lookups are open-ended: pagination runs until the remote
    /// signals the last page
    pub(crate) fn submit_follow_lookup(&self, user_id: u64) -> Result<()> {
        let task = Task::new(TaskKind::FollowLookup { user_id }, u32::MAX)?;
        self.submit(task);
        Ok(())
    }

    /// Submits a user lookup for the ids not yet persisted
    ///
    /// Already-known ids are filtered out first. When nothing is left the
    /// batch is dropped silently; an attached completion hook then runs
    /// immediately, since every user it depends on already exists.
    pub(crate) fn submit_user_lookup(
        &self,
        user_ids: Vec<u64>,
        on_complete: Option<CompletionHook>,
    ) -> Result<()> {
        if user_ids.is_empty() {
            return Err(crate::MagpieError::InvalidTask(
                "empty user-lookup batch".to_string(),
            ));
        }

        let fresh: Vec<u64> = {
            let store = self.store.lock().unwrap();
            user_ids
                .into_iter()
                .filter(|&id| match store.exists_user(id) {
                    Ok(exists) => !exists,
                    Err(err) => {
                        tracing::warn!("existence check for user {} failed: {}", id, err);
                        true
                    }
                })
                .collect()
        };

        if fresh.is_empty() {
            if let Some(hook) = on_complete {
                let mut store = self.store.lock().unwrap();
                if let Err(err) = hook(&mut **store) {
                    tracing::error!("deferred edge write failed: {}", err);
                }
            }
            return Ok(());
        }

        let count = fresh.len() as u32;
        let task = Task::new(
            TaskKind::UserLookup {
                user_ids: fresh,
                on_complete,
            },
            count,
        )?;
        self.submit(task);
        Ok(())
    }

    pub(crate) fn submit_quote_lookup(&self, content_id: u64, count: u32) -> Result<()> {
        let task = Task::new(TaskKind::QuoteLookup { content_id }, count)?;
        self.submit(task);
        Ok(())
    }

    pub(crate) fn submit_repost_lookup(&self, content_id: u64, count: u32) -> Result<()> {
        let task = Task::new(TaskKind::RepostLookup { content_id }, count)?;
        self.submit(task);
        Ok(())
    }

    pub(crate) fn submit_like_lookup(&self, content_id: u64, count: u32) -> Result<()> {
        let task = Task::new(TaskKind::LikeLookup { content_id }, count)?;
        self.submit(task);
        Ok(())
    }

    pub(crate) fn submit_reply_lookup(&self, conversation_id: u64, count: u32) -> Result<()> {
        let task = Task::new(TaskKind::ReplyLookup { conversation_id }, count)?;
        self.submit(task);
        Ok(())
    }

    /// Reschedules a throttled task and parks its credential
    ///
    /// The credential's availability moves to the reported reset time; the
    /// task re-enters its own queue at HIGHEST priority so it regains its
    /// place as soon as the pool reopens.
    pub(crate) fn report_rate_limited(
        &self,
        task: &Task,
        credential: &Credential,
        reset_at: Instant,
    ) {
        let category = task.category();
        let queue = self.queue(category);
        queue.pool().set_available_at(credential, reset_at);
        queue.submit(task.escalated());
        tracing::info!(
            category = %category,
            credential = credential.id(),
            "rate limited; task rescheduled at highest priority"
        );
    }

    pub(crate) fn status(&self) -> Vec<QueueStatus> {
        Category::ALL
            .iter()
            .map(|&category| {
                let size = self.queue(category).len();
                let ceiling = category.per_window_ceiling();
                let windows = (size as u64).div_ceil(ceiling);
                QueueStatus {
                    category,
                    size,
                    estimated_minutes_remaining: windows * WINDOW_MINUTES,
                }
            })
            .collect()
    }
}

/// The crawl coordinator handle
pub struct Coordinator {
    shared: Arc<Shared>,
    stop_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Coordinator {
    /// Creates a coordinator with one queue per category
    ///
    /// Every queue gets its own pool over the same bearer tokens, because
    /// the remote API accounts rate limits per (credential, endpoint
    /// family), not per credential globally.
    pub fn new(
        config: CrawlerConfig,
        bearer_tokens: &[String],
        api: Arc<dyn GraphApi>,
        store: Box<dyn GraphStore>,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = watch::channel(false);

        let queues = Category::ALL
            .iter()
            .map(|_| {
                let pool = CredentialPool::new(bearer_tokens.iter().cloned())?;
                Ok(Arc::new(WorkQueue::new(Arc::new(pool))))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            shared: Arc::new(Shared {
                queues,
                api,
                store: Mutex::new(store),
                config,
                stop_rx,
            }),
            stop_tx,
            handles: Vec::new(),
        })
    }

    /// Spawns one scheduler loop per category
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            return;
        }

        for category in Category::ALL {
            let shared = Arc::clone(&self.shared);
            self.handles
                .push(tokio::spawn(scheduler::run_loop(shared, category)));
        }

        tracing::info!("started {} scheduler loops", Category::ALL.len());
    }

    /// Signals all loops to stop and waits for them to finish their current
    /// drain cycle
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        for handle in self.handles {
            if let Err(err) = handle.await {
                tracing::error!("scheduler loop ended abnormally: {}", err);
            }
        }
        tracing::info!("all scheduler loops stopped");
    }

    pub fn submit_hashtag_search(&self, hashtag: &str, count: u32) -> Result<()> {
        self.shared.submit_hashtag_search(hashtag, count)
    }

    pub fn submit_follow_lookup(&self, user_id: u64) -> Result<()> {
        self.shared.submit_follow_lookup(user_id)
    }

    pub fn submit_user_lookup(
        &self,
        user_ids: Vec<u64>,
        on_complete: Option<CompletionHook>,
    ) -> Result<()> {
        self.shared.submit_user_lookup(user_ids, on_complete)
    }

    pub fn submit_quote_lookup(&self, content_id: u64, count: u32) -> Result<()> {
        self.shared.submit_quote_lookup(content_id, count)
    }

    pub fn submit_repost_lookup(&self, content_id: u64, count: u32) -> Result<()> {
        self.shared.submit_repost_lookup(content_id, count)
    }

    pub fn submit_like_lookup(&self, content_id: u64, count: u32) -> Result<()> {
        self.shared.submit_like_lookup(content_id, count)
    }

    pub fn submit_reply_lookup(&self, conversation_id: u64, count: u32) -> Result<()> {
        self.shared.submit_reply_lookup(conversation_id, count)
    }

    /// Current size and remaining-time estimate for every queue
    pub fn status(&self) -> Vec<QueueStatus> {
        self.shared.status()
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}
