// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Live-query decorator for a watch-backed cache.
//!
//! Reads go straight to the wrapped cache. When a read succeeds and the
//! caller passed a live signal, a listener is attached to the subscription
//! handle of the kind that was read:
//! - `get` attaches an [`ObjectListener`] for the object's name/namespace
//! - `list` attaches a [`KindListener`] that fires for any object of the kind,
//!   since additions make a list stale too
//!
//! Attaching is best effort. A failure is logged and the read still succeeds.
//!
//! Listeners are reaped lazily: a listener whose request has ended is only
//! removed when the next event reaches its handle, or when the handle stops.

use std::sync::Arc;
use tracing::{debug, warn};

use super::listener::{KindListener, ObjectListener};
use super::signal::LiveSignal;
use crate::kubernetes::{
    CacheError, CacheObject, HandleKey, Listener, ListOptions, ObjectKey, ObjectList,
    ResourceIdentity, WatchCache,
};

pub struct LiveQueryCache<C> {
    inner: C,
}

impl<C: WatchCache> LiveQueryCache<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Read one object, tracking it for the live query if one is given
    pub async fn get<O: CacheObject>(
        &self,
        key: &ObjectKey,
        dest: &mut O,
        live: Option<&Arc<dyn LiveSignal>>,
    ) -> Result<(), CacheError> {
        // The handle that serves the read, not whatever kind the loaded value carries
        let handle = dest.handle_key();
        self.inner.get(key, dest).await?;
        if let Some(signal) = live.filter(|s| s.is_live()) {
            match handle {
                Ok(handle) => self.track_object(handle, key, signal).await,
                Err(e) => warn!(error = %e, "Cannot track object for live query"),
            }
        }
        Ok(())
    }

    /// Read a collection, tracking its whole kind for the live query if one is given
    pub async fn list<L: ObjectList>(
        &self,
        dest: &mut L,
        options: &ListOptions,
        live: Option<&Arc<dyn LiveSignal>>,
    ) -> Result<(), CacheError> {
        let handle = dest.list_kind().resolve()?;
        self.inner.list(dest, options).await?;
        if let Some(signal) = live.filter(|s| s.is_live()) {
            self.attach(&handle, Arc::new(KindListener::new(Arc::clone(signal))))
                .await;
        }
        Ok(())
    }

    async fn track_object(
        &self,
        handle: HandleKey,
        key: &ObjectKey,
        signal: &Arc<dyn LiveSignal>,
    ) {
        let identity = ResourceIdentity {
            gvk: handle.gvk.clone(),
            key: key.clone(),
        };
        let listener = ObjectListener::new(identity.key.clone(), Arc::clone(signal));
        if self.attach(&handle, Arc::new(listener)).await {
            debug!(object = %identity, "Tracking object for live query");
        }
    }

    /// Attach a listener to a handle, returns whether it was attached
    async fn attach(&self, handle: &HandleKey, listener: Arc<dyn Listener>) -> bool {
        let informer = match self.inner.subscription(handle).await {
            Ok(informer) => informer,
            Err(e) => {
                warn!(handle = %handle, error = %e, "Cannot get subscription handle for live query");
                return false;
            }
        };

        match informer.add_listener(listener) {
            Ok(token) => {
                debug!(
                    handle = %handle,
                    token = ?token,
                    listeners = informer.listener_count(),
                    "Attached live query listener"
                );
                true
            }
            Err(e) => {
                warn!(handle = %handle, error = %e, "Cannot attach live query listener");
                false
            }
        }
    }
}
