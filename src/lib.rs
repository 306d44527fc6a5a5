// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Live-query invalidation for Kubernetes watch caches.
//!
//! [`live::LiveQueryCache`] wraps a [`kubernetes::WatchCache`]. Reads made
//! with a [`live::LiveSignal`] attach listeners to the watch of the kind they
//! read, and the signal is notified when a read object (or, for lists, any
//! object of the kind) later changes.

pub mod kubernetes;
pub mod live;
pub mod progress;
