// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for watch startup
//!
//! Lets the watch cache report when it starts and syncs watches, so the CLI
//! can show a spinner while the first read of a kind waits for its list.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    /// A watch is being started for a kind
    WatchStarting { handle: String },
    /// Initial list applied
    WatchSynced {
        handle: String,
        objects: usize,
        elapsed_ms: u64,
    },
    /// The watch stream reported an error (it retries with backoff)
    WatchError { handle: String, error: String },
}

/// Watch progress reporter
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
    watches_started: AtomicUsize,
    watches_synced: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            watches_started: AtomicUsize::new(0),
            watches_synced: AtomicUsize::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    pub fn watch_starting(&self, handle: &str) {
        self.watches_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::WatchStarting {
            handle: handle.to_string(),
        });
    }

    pub fn watch_synced(&self, handle: &str, objects: usize, elapsed_ms: u64) {
        self.watches_synced.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::WatchSynced {
            handle: handle.to_string(),
            objects,
            elapsed_ms,
        });
    }

    pub fn watch_error(&self, handle: &str, error: &str) {
        let _ = self.sender.send(ProgressUpdate::WatchError {
            handle: handle.to_string(),
            error: error.to_string(),
        });
    }

    /// Watches (synced, started)
    pub fn progress(&self) -> (usize, usize) {
        (
            self.watches_synced.load(Ordering::SeqCst),
            self.watches_started.load(Ordering::SeqCst),
        )
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reporter_new() {
        let reporter = ProgressReporter::new();
        assert_eq!(reporter.progress(), (0, 0));
    }

    #[test]
    fn test_watch_counters() {
        let reporter = ProgressReporter::default();
        reporter.watch_starting("v1/Pod (unstructured)");
        reporter.watch_starting("v1/Node (metadata)");
        assert_eq!(reporter.progress(), (0, 2));

        reporter.watch_synced("v1/Pod (unstructured)", 12, 40);
        assert_eq!(reporter.progress(), (1, 2));
    }

    #[test]
    fn test_subscribe_receives_updates() {
        let reporter = ProgressReporter::new();
        let mut receiver = reporter.subscribe();

        reporter.watch_starting("v1/Pod (structured)");
        reporter.watch_error("v1/Pod (structured)", "forbidden");
        reporter.watch_synced("v1/Pod (structured)", 3, 15);

        let updates: Vec<_> = std::iter::from_fn(|| receiver.try_recv().ok()).collect();
        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[0], ProgressUpdate::WatchStarting { .. }));
        match &updates[1] {
            ProgressUpdate::WatchError { error, .. } => assert_eq!(error, "forbidden"),
            other => panic!("Expected WatchError, got {:?}", other),
        }
        assert!(matches!(
            updates[2],
            ProgressUpdate::WatchSynced { objects: 3, .. }
        ));
    }

    #[test]
    fn test_send_without_subscribers() {
        // No receivers: send errors are ignored
        let handle = create_progress_handle();
        handle.watch_starting("v1/Pod (structured)");
        assert_eq!(handle.progress(), (0, 1));
    }
}
