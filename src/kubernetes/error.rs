// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use thiserror::Error;

use super::identity::{HandleKey, ObjectKey, Representation};

/// The item kind of a list could not be determined
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no kind set on {0} list")]
    MissingKind(Representation),

    #[error("list kind {0:?} does not name an item kind")]
    EmptyItemKind(String),
}

/// Errors returned by watch-backed cache reads
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("{handle} {key} not found")]
    NotFound { handle: HandleKey, key: ObjectKey },

    #[error("cannot determine the kind of a {0} object")]
    UnknownKind(Representation),

    #[error("cannot resolve list item kind: {0}")]
    Resolve(#[from] ResolveError),

    #[error("cannot decode cached {kind}: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid label selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("timed out waiting for {0} to sync")]
    SyncTimeout(HandleKey),

    #[error("watch for {0} has stopped")]
    Stopped(HandleKey),

    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}
