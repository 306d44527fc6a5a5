// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

/// Per-request liveness check and change callback.
///
/// `notify_changed` is called from watch delivery paths, possibly many times
/// and from many threads for one logical change. Implementations must not
/// block and must tolerate repeats: delivery is at-least-once.
pub trait LiveSignal: Send + Sync {
    fn is_live(&self) -> bool;
    fn notify_changed(&self);
}

/// Live-query signal that collapses notifications into a dirty flag.
pub struct LiveQuery {
    live: AtomicBool,
    dirty: AtomicBool,
    notifications: AtomicU64,
    changed: Notify,
}

impl LiveQuery {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            live: AtomicBool::new(true),
            dirty: AtomicBool::new(false),
            notifications: AtomicU64::new(0),
            changed: Notify::new(),
        })
    }

    /// The request is finished; listeners drop off on their next event
    pub fn end(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Clear and return the dirty flag
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Total `notify_changed` calls, including collapsed repeats
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Wait for the next change notification.
    ///
    /// Returns immediately if a notification arrived since the last wait.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

impl LiveSignal for LiveQuery {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn notify_changed(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        self.dirty.store(true, Ordering::Release);
        // At most one stored permit, so repeats collapse while nobody waits
        self.changed.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_query_is_live_and_clean() {
        let query = LiveQuery::new();
        assert!(query.is_live());
        assert!(!query.is_dirty());
        query.end();
        assert!(!query.is_live());
    }

    #[test]
    fn test_notifications_collapse_to_dirty_flag() {
        let query = LiveQuery::new();
        for _ in 0..5 {
            query.notify_changed();
        }
        assert_eq!(query.notifications(), 5);
        assert!(query.take_dirty());
        assert!(!query.take_dirty());
    }

    #[tokio::test]
    async fn test_changed_wakes_after_notification() {
        let query = LiveQuery::new();
        let waiter = {
            let query = Arc::clone(&query);
            tokio::spawn(async move { query.changed().await })
        };
        tokio::task::yield_now().await;
        query.notify_changed();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_notification_before_wait_is_not_lost() {
        let query = LiveQuery::new();
        query.notify_changed();
        tokio::time::timeout(Duration::from_secs(5), query.changed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_changed_wakes_for_each_later_change() {
        let query = LiveQuery::new();
        query.notify_changed();
        query.changed().await;

        // Dirty flag never taken, the next change must still wake a waiter
        query.notify_changed();
        tokio::time::timeout(Duration::from_millis(500), query.changed())
            .await
            .unwrap();
        assert!(query.is_dirty());
    }

    #[tokio::test]
    async fn test_repeated_notifications_store_one_wakeup() {
        let query = LiveQuery::new();
        for _ in 0..3 {
            query.notify_changed();
        }
        query.changed().await;
        let second = tokio::time::timeout(Duration::from_millis(50), query.changed()).await;
        assert!(second.is_err());
    }

    #[test]
    fn test_concurrent_notify() {
        let query = LiveQuery::new();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let query = Arc::clone(&query);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        query.notify_changed();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(query.notifications(), 8000);
        assert!(query.take_dirty());
    }
}
