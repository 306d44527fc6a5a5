// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! The watch-backed cache interface decorated by the live-query layer.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::CacheError;
use super::identity::{HandleKey, ObjectKey};
use super::informer::Informer;
use super::object::{CacheObject, ObjectList};
use super::selectors::LabelSelector;

/// Filters applied to list reads
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only objects in this namespace (all namespaces if None)
    pub namespace: Option<String>,
    /// Label selector string (e.g., "app=nginx,tier!=db")
    pub label_selector: Option<String>,
}

impl ListOptions {
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    pub fn with_label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    fn selector(&self) -> Result<Option<LabelSelector>, CacheError> {
        self.label_selector
            .as_deref()
            .map(LabelSelector::parse)
            .transpose()
    }
}

/// Object cache kept current by one watch per kind and representation
#[async_trait]
pub trait WatchCache: Send + Sync {
    /// Read one object into `dest`; its kind selects the watch
    async fn get<O: CacheObject>(&self, key: &ObjectKey, dest: &mut O) -> Result<(), CacheError>;

    /// Read a collection into `dest`; its list kind selects the watch
    async fn list<L: ObjectList>(&self, dest: &mut L, options: &ListOptions)
    -> Result<(), CacheError>;

    /// Subscription handle for a kind, starting its watch if needed
    async fn subscription(&self, key: &HandleKey) -> Result<Arc<Informer>, CacheError>;
}

/// Serve a `get` from an informer's store
pub fn read_object<O: CacheObject>(
    informer: &Informer,
    key: &ObjectKey,
    dest: &mut O,
) -> Result<(), CacheError> {
    let obj = informer.get(key).ok_or_else(|| CacheError::NotFound {
        handle: informer.key().clone(),
        key: key.clone(),
    })?;
    dest.load(&obj)
}

/// Serve a `list` from an informer's store
pub fn read_list<L: ObjectList>(
    informer: &Informer,
    dest: &mut L,
    options: &ListOptions,
) -> Result<(), CacheError> {
    let selector = options.selector()?;
    let items = informer.list(options.namespace.as_deref(), selector.as_ref());
    dest.load(&items)
}
