//! Per-category scheduler loop
//!
//! Each category runs one loop: drain every ready task sequentially, then
//! sleep until the queue's earliest credential time, or for a short poll
//! interval when nothing is pending there. The poll fallback is what picks
//! up work fanned out from other categories' executions without the queues
//! having to signal the loop directly.

use crate::crawler::coordinator::Shared;
use crate::crawler::execute;
use crate::crawler::task::Category;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) async fn run_loop(shared: Arc<Shared>, category: Category) {
    let queue = Arc::clone(shared.queue(category));
    let poll_interval = Duration::from_millis(shared.config.poll_interval_ms);
    let mut stop_rx = shared.stop_rx.clone();

    tracing::debug!(category = %category, "scheduler loop started");

    loop {
        if shared.stopping() {
            break;
        }

        // Drain: strictly sequential, one in-flight remote call per category
        while let Some(task) = queue.try_take_ready(Instant::now()) {
            let (credential, _) = queue.pool().earliest();
            // Optimistic refresh: assume no cool-down until the remote says
            // otherwise
            queue.pool().set_available_at(&credential, Instant::now());

            execute::execute_task(&shared, task, &credential).await;
        }

        let next_credential = queue.next_credential_time();
        let now = Instant::now();
        let wake = if next_credential > now {
            next_credential
        } else {
            now + poll_interval
        };

        tokio::select! {
            _ = stop_rx.changed() => {}
            _ = tokio::time::sleep_until(wake.into()) => {}
        }
    }

    tracing::debug!(category = %category, "scheduler loop stopped");
}

#[cfg(test)]
mod tests {
    use crate::config::CrawlerConfig;
    use crate::crawler::coordinator::Coordinator;
    use crate::crawler::task::Category;
    use crate::crawler::testing::{user_page, FakeApi, RecordingStore, Scripted};
    use crate::model::FollowEdge;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_loops_drain_and_pick_up_fanned_out_work() {
        let config = CrawlerConfig {
            poll_interval_ms: 100,
            fanout_limit: 100,
            status_interval_secs: 60,
        };
        let api = Arc::new(FakeApi::new());
        let (store, state) = RecordingStore::new();
        let mut coordinator = Coordinator::new(
            config,
            &["token".to_string()],
            Arc::clone(&api) as Arc<dyn crate::api::GraphApi>,
            Box::new(store),
        )
        .unwrap();

        // Follow lookup discovers user 2; its loop fans a user lookup into
        // another queue, whose loop picks it up on its own poll tick
        api.script(
            Category::FollowLookup,
            Scripted::Users(user_page(&[2], None)),
        );
        api.script(
            Category::UserLookup,
            Scripted::Users(user_page(&[2], None)),
        );

        coordinator.submit_follow_lookup(10).unwrap();
        coordinator.start();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if !state.lock().unwrap().follow_edges.is_empty() {
                break;
            }
            assert!(
                Instant::now() < deadline,
                "fan-out chain did not complete in time"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        coordinator.shutdown().await;

        let state = state.lock().unwrap();
        assert!(state.users.contains_key(&2));
        assert_eq!(
            state.follow_edges,
            vec![FollowEdge {
                user_id: 10,
                follows_id: 2,
            }]
        );
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_idle_loops() {
        let config = CrawlerConfig {
            poll_interval_ms: 60_000,
            fanout_limit: 100,
            status_interval_secs: 60,
        };
        let api = Arc::new(FakeApi::new());
        let (store, _state) = RecordingStore::new();
        let mut coordinator = Coordinator::new(
            config,
            &["token".to_string()],
            Arc::clone(&api) as Arc<dyn crate::api::GraphApi>,
            Box::new(store),
        )
        .unwrap();

        coordinator.start();
        // Give the loops a moment to reach their first sleep
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Even with a one-minute poll interval, shutdown must not wait for
        // the next wake-up
        let before = Instant::now();
        coordinator.shutdown().await;
        assert!(before.elapsed() < Duration::from_secs(5));
    }
}
