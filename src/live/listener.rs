// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Listeners attached on behalf of live reads.
//!
//! Both kinds check liveness first. A listener whose request has ended asks
//! to be removed and does nothing else with the event.

use std::sync::Arc;

use super::signal::LiveSignal;
use crate::kubernetes::{Disposition, Listener, ObjectKey, WatchEvent};

/// Notifies on events for one object, matched by name and namespace
pub struct ObjectListener {
    key: ObjectKey,
    signal: Arc<dyn LiveSignal>,
}

impl ObjectListener {
    pub fn new(key: ObjectKey, signal: Arc<dyn LiveSignal>) -> Self {
        Self { key, signal }
    }
}

impl Listener for ObjectListener {
    fn on_event(&self, event: &WatchEvent) -> Disposition {
        if !self.signal.is_live() {
            return Disposition::Remove;
        }
        if self.key.matches(&event.object().metadata) {
            self.signal.notify_changed();
        }
        Disposition::Keep
    }
}

/// Notifies on every event of its kind
pub struct KindListener {
    signal: Arc<dyn LiveSignal>,
}

impl KindListener {
    pub fn new(signal: Arc<dyn LiveSignal>) -> Self {
        Self { signal }
    }
}

impl Listener for KindListener {
    fn on_event(&self, _event: &WatchEvent) -> Disposition {
        if !self.signal.is_live() {
            return Disposition::Remove;
        }
        self.signal.notify_changed();
        Disposition::Keep
    }
}
