//! Priority work queue, one per task category
//!
//! Ordering is `(priority desc, submission order asc)`. The FIFO tie-break
//! matters: a long paginated crawl keeps resubmitting continuations at the
//! same priority and must not starve sibling seeds.

use crate::crawler::pool::CredentialPool;
use crate::crawler::task::Task;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A task queued with its submission sequence number
#[derive(Debug)]
struct QueuedTask {
    task: Task,
    seq: u64,
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority pops first; among equals, lower seq pops first
        self.task
            .priority()
            .cmp(&other.task.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.task.priority() == other.task.priority() && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

/// Unbounded priority queue of tasks, paired 1:1 with a credential pool
///
/// `submit` is safe for concurrent callers: a task executing in one
/// category's loop fans out into other categories' queues.
#[derive(Debug)]
pub struct WorkQueue {
    pool: Arc<CredentialPool>,
    inner: Mutex<Inner>,
}

impl WorkQueue {
    pub fn new(pool: Arc<CredentialPool>) -> Self {
        Self {
            pool,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Inserts a task. No uniqueness check; avoiding duplicate work is the
    /// fan-out policy's responsibility.
    pub fn submit(&self, task: Task) {
        let mut inner = self.inner.lock().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(QueuedTask { task, seq });
    }

    /// Pops the highest-priority task, but only if a credential is ready
    ///
    /// When no credential is usable at `now` the queue is left untouched,
    /// regardless of how much work is waiting.
    pub fn try_take_ready(&self, now: Instant) -> Option<Task> {
        if !self.pool.is_any_ready(now) {
            return None;
        }

        self.inner.lock().unwrap().heap.pop().map(|q| q.task)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    /// The earliest instant at which any of this queue's credentials is
    /// usable
    pub fn next_credential_time(&self) -> Instant {
        self.pool.next_available_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::task::{Priority, TaskKind};
    use std::time::Duration;

    fn test_queue() -> WorkQueue {
        WorkQueue::new(Arc::new(CredentialPool::new(["token"]).unwrap()))
    }

    fn quote_task(content_id: u64, priority: Priority) -> Task {
        Task::new(TaskKind::QuoteLookup { content_id }, 10)
            .unwrap()
            .with_priority(priority)
    }

    fn taken_content_id(task: &Task) -> u64 {
        match task.kind() {
            TaskKind::QuoteLookup { content_id } => *content_id,
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_priority_ordering() {
        let queue = test_queue();
        queue.submit(quote_task(1, Priority::Low));
        queue.submit(quote_task(2, Priority::Highest));
        queue.submit(quote_task(3, Priority::Normal));
        queue.submit(quote_task(4, Priority::High));

        let order: Vec<u64> = std::iter::from_fn(|| queue.try_take_ready(Instant::now()))
            .map(|t| taken_content_id(&t))
            .collect();

        assert_eq!(order, vec![2, 4, 3, 1]);
    }

    #[test]
    fn test_fifo_within_priority() {
        let queue = test_queue();
        for id in 1..=5 {
            queue.submit(quote_task(id, Priority::Normal));
        }

        let order: Vec<u64> = std::iter::from_fn(|| queue.try_take_ready(Instant::now()))
            .map(|t| taken_content_id(&t))
            .collect();

        assert_eq!(order, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_higher_priority_preempts_earlier_submissions() {
        let queue = test_queue();
        queue.submit(quote_task(1, Priority::Normal));
        queue.submit(quote_task(2, Priority::Normal));
        queue.submit(quote_task(3, Priority::Highest));

        let first = queue.try_take_ready(Instant::now()).unwrap();
        assert_eq!(taken_content_id(&first), 3);
    }

    #[test]
    fn test_take_gated_on_credential_readiness() {
        let queue = test_queue();
        queue.submit(quote_task(1, Priority::Normal));

        let now = Instant::now();
        let (credential, _) = queue.pool().earliest();
        queue
            .pool()
            .set_available_at(&credential, now + Duration::from_secs(900));

        // Nothing is ready, and the queue is not mutated
        assert!(queue.try_take_ready(now).is_none());
        assert_eq!(queue.len(), 1);

        // Once the cool-down passes, the same task comes out
        let later = now + Duration::from_secs(901);
        let task = queue.try_take_ready(later).unwrap();
        assert_eq!(taken_content_id(&task), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_queue_yields_nothing() {
        let queue = test_queue();
        assert!(queue.try_take_ready(Instant::now()).is_none());
    }
}
