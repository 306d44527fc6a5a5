// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Subscription handle for one kind: a mirrored object store plus the
//! listeners attached to it.
//!
//! The informer does not talk to the API server itself. A watch task (see
//! `KubeCache`) feeds it `apply`/`delete` and relist brackets; the informer
//! keeps the store current and turns each change into a [`WatchEvent`].

use kube::api::DynamicObject;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::error::CacheError;
use super::identity::{HandleKey, ObjectKey, Representation, type_meta};
use super::registry::{Listener, ListenerRegistry, ListenerToken, WatchEvent};
use super::selectors::LabelSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Pending,
    Synced,
    Stopped,
}

pub struct Informer {
    key: HandleKey,
    store: RwLock<HashMap<ObjectKey, Arc<DynamicObject>>>,
    /// Keys seen since the current relist began
    resync: Mutex<Option<HashSet<ObjectKey>>>,
    listeners: ListenerRegistry,
    state: watch::Sender<SyncState>,
    stopped: AtomicBool,
}

impl Informer {
    pub fn new(key: HandleKey) -> Self {
        let (state, _) = watch::channel(SyncState::Pending);
        Self {
            key,
            store: RwLock::new(HashMap::new()),
            resync: Mutex::new(None),
            listeners: ListenerRegistry::new(),
            state,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &HandleKey {
        &self.key
    }

    // === Listeners ===

    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> Result<ListenerToken, CacheError> {
        if self.is_stopped() {
            return Err(CacheError::Stopped(self.key.clone()));
        }
        let token = self.listeners.add(listener);
        // stop() may have cleared the registry between the check and the insert
        if self.is_stopped() {
            self.listeners.remove(token);
            return Err(CacheError::Stopped(self.key.clone()));
        }
        Ok(token)
    }

    pub fn remove_listener(&self, token: ListenerToken) -> bool {
        self.listeners.remove(token)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // === Store ===

    pub fn get(&self, key: &ObjectKey) -> Option<Arc<DynamicObject>> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Objects in the store, sorted by namespace and name
    pub fn list(
        &self,
        namespace: Option<&str>,
        selector: Option<&LabelSelector>,
    ) -> Vec<Arc<DynamicObject>> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let mut items: Vec<(&ObjectKey, &Arc<DynamicObject>)> = store
            .iter()
            .filter(|(key, _)| namespace.is_none() || key.namespace.as_deref() == namespace)
            .filter(|(_, obj)| selector.is_none_or(|s| s.matches(obj.metadata.labels.as_ref())))
            .collect();
        items.sort_by(|a, b| a.0.cmp(b.0));
        items.into_iter().map(|(_, obj)| Arc::clone(obj)).collect()
    }

    pub fn len(&self) -> usize {
        self.store.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // === Watch input ===

    /// Record a created or modified object
    pub fn apply(&self, mut obj: DynamicObject) {
        let Some(key) = ObjectKey::from_meta(&obj.metadata) else {
            warn!(handle = %self.key, "Ignoring watched object without a name");
            return;
        };
        self.stamp_types(&mut obj);

        if let Some(seen) = self
            .resync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            seen.insert(key.clone());
        }

        let new = Arc::new(obj);
        let old = self
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&new));

        let event = match old {
            Some(old) => WatchEvent::Updated { old, new },
            None => WatchEvent::Added(new),
        };
        self.dispatch(&event);
    }

    /// Record a deleted object
    pub fn delete(&self, mut obj: DynamicObject) {
        let Some(key) = ObjectKey::from_meta(&obj.metadata) else {
            return;
        };
        self.stamp_types(&mut obj);

        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);

        // The final state sent by the server, not the last cached one
        self.dispatch(&WatchEvent::Removed(Arc::new(obj)));
    }

    /// A relist started; objects not applied before `finish_resync` are gone
    pub fn begin_resync(&self) {
        *self.resync.lock().unwrap_or_else(PoisonError::into_inner) = Some(HashSet::new());
    }

    /// The relist finished: drop objects that were not seen and mark synced
    pub fn finish_resync(&self) {
        let seen = self
            .resync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();

        let gone: Vec<Arc<DynamicObject>> = {
            let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
            let stale: Vec<ObjectKey> = store
                .keys()
                .filter(|key| !seen.contains(*key))
                .cloned()
                .collect();
            stale.iter().filter_map(|key| store.remove(key)).collect()
        };

        for obj in gone {
            self.dispatch(&WatchEvent::Removed(obj));
        }
        self.mark_synced();
    }

    // === Lifecycle ===

    pub fn mark_synced(&self) {
        if !self.is_stopped() {
            self.state.send_replace(SyncState::Synced);
        }
    }

    pub fn is_synced(&self) -> bool {
        *self.state.borrow() == SyncState::Synced
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Wait until the initial list has been applied
    pub async fn wait_synced(&self, timeout: Duration) -> Result<(), CacheError> {
        let mut rx = self.state.subscribe();
        let state = tokio::time::timeout(timeout, rx.wait_for(|s| *s != SyncState::Pending))
            .await
            .map_err(|_| CacheError::SyncTimeout(self.key.clone()))?
            .map(|s| *s)
            .map_err(|_| CacheError::Stopped(self.key.clone()))?;

        match state {
            SyncState::Stopped => Err(CacheError::Stopped(self.key.clone())),
            _ => Ok(()),
        }
    }

    /// Stop the handle: every listener is dropped and no new ones are accepted
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.send_replace(SyncState::Stopped);
        let dropped = self.listeners.clear();
        debug!(handle = %self.key, dropped, "Subscription handle stopped");
    }

    /// Metadata watches report the erased `meta.k8s.io/v1` type, so the
    /// handle's kind replaces it
    fn stamp_types(&self, obj: &mut DynamicObject) {
        if obj.types.is_none() || self.key.representation == Representation::Metadata {
            obj.types = Some(type_meta(&self.key.gvk));
        }
    }

    fn dispatch(&self, event: &WatchEvent) {
        let removed = self.listeners.dispatch(event);
        trace!(
            handle = %self.key,
            action = event.action(),
            name = event.object().metadata.name.as_deref().unwrap_or_default(),
            removed,
            "Dispatched watch event"
        );
    }
}
