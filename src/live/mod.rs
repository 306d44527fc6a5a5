// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Live queries: reads that learn when the objects they returned change.

mod cache;
mod listener;
mod signal;

pub use cache::LiveQueryCache;
pub use listener::{KindListener, ObjectListener};
pub use signal::{LiveQuery, LiveSignal};
