// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! In-memory watch cache for tests: informers are fed by hand instead of
//! by a watch stream.

use async_trait::async_trait;
use kube::api::{DynamicObject, GroupVersionKind};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::cache::{ListOptions, WatchCache, read_list, read_object};
use super::error::CacheError;
use super::identity::{HandleKey, ObjectKey, Representation, gvk_from_type_meta};
use super::informer::Informer;
use super::object::{CacheObject, ObjectList};

#[derive(Default)]
pub struct MemoryCache {
    informers: Mutex<HashMap<HandleKey, Arc<Informer>>>,
    /// Make `subscription` fail, reads keep working
    pub fail_subscriptions: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synced informer for a key, created empty on first use
    pub fn informer(&self, key: &HandleKey) -> Arc<Informer> {
        let mut informers = self.informers.lock().unwrap();
        let informer = informers.entry(key.clone()).or_insert_with(|| {
            let informer = Informer::new(key.clone());
            informer.mark_synced();
            Arc::new(informer)
        });
        Arc::clone(informer)
    }

    pub fn seed(&self, representation: Representation, obj: DynamicObject) {
        self.apply(representation, obj);
    }

    pub fn apply(&self, representation: Representation, obj: DynamicObject) {
        self.informer(&key_of(representation, &obj)).apply(obj);
    }

    pub fn delete(&self, representation: Representation, obj: DynamicObject) {
        self.informer(&key_of(representation, &obj)).delete(obj);
    }

    pub fn listener_count(&self, key: &HandleKey) -> usize {
        self.informers
            .lock()
            .unwrap()
            .get(key)
            .map_or(0, |i| i.listener_count())
    }
}

fn key_of(representation: Representation, obj: &DynamicObject) -> HandleKey {
    let gvk = gvk_from_type_meta(obj.types.as_ref()).expect("test object without apiVersion/kind");
    HandleKey::new(gvk, representation)
}

#[async_trait]
impl WatchCache for MemoryCache {
    async fn get<O: CacheObject>(&self, key: &ObjectKey, dest: &mut O) -> Result<(), CacheError> {
        let informer = self.informer(&dest.handle_key()?);
        read_object(&informer, key, dest)
    }

    async fn list<L: ObjectList>(
        &self,
        dest: &mut L,
        options: &ListOptions,
    ) -> Result<(), CacheError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let informer = self.informer(&dest.list_kind().resolve()?);
        read_list(&informer, dest, options)
    }

    async fn subscription(&self, key: &HandleKey) -> Result<Arc<Informer>, CacheError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(CacheError::SyncTimeout(key.clone()));
        }
        Ok(self.informer(key))
    }
}

pub fn widget_key() -> HandleKey {
    HandleKey::new(
        GroupVersionKind::gvk("example.org", "v1", "Widget"),
        Representation::Unstructured,
    )
}

pub fn widget(namespace: &str, name: &str, revision: u64) -> DynamicObject {
    serde_json::from_value(json!({
        "apiVersion": "example.org/v1",
        "kind": "Widget",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": revision.to_string(),
        },
        "spec": { "size": revision }
    }))
    .unwrap()
}

pub fn configmap(namespace: &str, name: &str) -> DynamicObject {
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": namespace },
        "data": { "mode": "fast" }
    }))
    .unwrap()
}
