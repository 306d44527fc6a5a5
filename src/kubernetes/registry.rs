// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Listener bookkeeping for one subscription handle.
//!
//! Dispatch takes a snapshot of the listener set under the read lock and
//! invokes listeners with no lock held. A listener that wants to go away
//! returns [`Disposition::Remove`]; the registry removes it by its token once
//! the event has been delivered. Listeners therefore never need a reference
//! to their own registration.

use kube::api::DynamicObject;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Change delivered to listeners of a handle
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Added(Arc<DynamicObject>),
    Updated {
        old: Arc<DynamicObject>,
        new: Arc<DynamicObject>,
    },
    Removed(Arc<DynamicObject>),
}

impl WatchEvent {
    /// The affected object (the new state for updates)
    pub fn object(&self) -> &DynamicObject {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Removed(obj) => obj,
            WatchEvent::Updated { new, .. } => new,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "added",
            WatchEvent::Updated { .. } => "updated",
            WatchEvent::Removed(_) => "removed",
        }
    }
}

/// What a listener wants after seeing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Remove,
}

/// Callback attached to a subscription handle.
///
/// Runs on the event delivery path: must not block and must not read
/// the cache.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &WatchEvent) -> Disposition;
}

impl<F> Listener for F
where
    F: Fn(&WatchEvent) -> Disposition + Send + Sync,
{
    fn on_event(&self, event: &WatchEvent) -> Disposition {
        self(event)
    }
}

/// Registration handed out by [`ListenerRegistry::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerToken(u64);

/// Thread-safe set of listeners keyed by token
#[derive(Default)]
pub struct ListenerRegistry {
    next_token: AtomicU64,
    listeners: RwLock<HashMap<ListenerToken, Arc<dyn Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn Listener>) -> ListenerToken {
        let token = ListenerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, listener);
        token
    }

    /// Remove a listener, returns false if it was already gone
    pub fn remove(&self, token: ListenerToken) -> bool {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener, returns how many were attached
    pub fn clear(&self) -> usize {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let count = listeners.len();
        listeners.clear();
        count
    }

    /// Deliver an event to every listener, returns the number removed
    pub fn dispatch(&self, event: &WatchEvent) -> usize {
        let snapshot: Vec<(ListenerToken, Arc<dyn Listener>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(token, listener)| (*token, Arc::clone(listener)))
            .collect();

        let expired: Vec<ListenerToken> = snapshot
            .into_iter()
            .filter(|(_, listener)| listener.on_event(event) == Disposition::Remove)
            .map(|(token, _)| token)
            .collect();

        if expired.is_empty() {
            return 0;
        }

        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        expired
            .iter()
            .filter(|token| listeners.remove(token).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn event(name: &str) -> WatchEvent {
        let obj: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "example.org/v1",
            "kind": "Widget",
            "metadata": { "name": name, "namespace": "default" }
        }))
        .unwrap();
        WatchEvent::Added(Arc::new(obj))
    }

    fn counting(counter: &Arc<AtomicUsize>, disposition: Disposition) -> Arc<dyn Listener> {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &WatchEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            disposition
        })
    }

    #[test]
    fn test_add_and_remove() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = registry.add(counting(&counter, Disposition::Keep));
        let b = registry.add(counting(&counter, Disposition::Keep));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dispatch_reaches_every_listener() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            registry.add(counting(&counter, Disposition::Keep));
        }
        assert_eq!(registry.dispatch(&event("a")), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_dispatch_removes_expired_listeners() {
        let registry = ListenerRegistry::new();
        let kept = Arc::new(AtomicUsize::new(0));
        let expired = Arc::new(AtomicUsize::new(0));
        registry.add(counting(&kept, Disposition::Keep));
        registry.add(counting(&expired, Disposition::Remove));

        assert_eq!(registry.dispatch(&event("a")), 1);
        assert_eq!(registry.len(), 1);

        registry.dispatch(&event("b"));
        assert_eq!(kept.load(Ordering::SeqCst), 2);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_detach_others_during_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let victim = registry.add(counting(&counter, Disposition::Keep));

        let reg = Arc::clone(&registry);
        registry.add(Arc::new(move |_: &WatchEvent| {
            reg.remove(victim);
            Disposition::Keep
        }));

        // Must not deadlock on the registry lock
        registry.dispatch(&event("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.add(counting(&counter, Disposition::Keep));
        registry.add(counting(&counter, Disposition::Keep));
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_attach_detach_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let counter = Arc::clone(&counter);
                thread::spawn(move || match i % 3 {
                    0 => {
                        registry.add(counting(&counter, Disposition::Keep));
                    }
                    1 => {
                        let token = registry.add(counting(&counter, Disposition::Keep));
                        registry.remove(token);
                    }
                    _ => {
                        registry.dispatch(&event("x"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // 34 permanent listeners (i % 3 == 0 for i in 0..100)
        assert_eq!(registry.len(), 34);
        let before = counter.load(Ordering::SeqCst);
        registry.dispatch(&event("y"));
        assert_eq!(counter.load(Ordering::SeqCst), before + 34);
    }
}
