// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Watch-backed cache on top of `kube::runtime` watchers.
//!
//! One cluster-wide watch per [`HandleKey`], started lazily on the first read
//! of a kind. Reads block (asynchronously) until the watch has applied its
//! initial list, then are served from the informer's store.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use kube::api::{Api, DynamicObject};
use kube::core::PartialObjectMeta;
use kube::runtime::{WatchStreamExt, metadata_watcher, watcher};
use kube::{Client, discovery};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::{ListOptions, WatchCache, read_list, read_object};
use super::error::CacheError;
use super::identity::{HandleKey, ObjectKey, Representation};
use super::informer::Informer;
use super::object::{CacheObject, ObjectList};
use crate::progress::{ProgressHandle, ProgressReporter};

/// Default time to wait for a new watch to list its kind
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct KubeCacheOptions {
    /// How long a read waits for a new watch to sync
    pub sync_timeout: Duration,
}

impl Default for KubeCacheOptions {
    fn default() -> Self {
        Self {
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }
}

pub struct KubeCache {
    client: Client,
    options: KubeCacheOptions,
    /// One informer per key; never held across discovery
    informers: tokio::sync::Mutex<HashMap<HandleKey, Arc<Informer>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    progress: ProgressHandle,
}

impl KubeCache {
    pub fn new(client: Client, options: KubeCacheOptions) -> Self {
        Self {
            client,
            options,
            informers: tokio::sync::Mutex::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            progress: crate::progress::create_progress_handle(),
        }
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// Keys of the watches started so far
    pub async fn handles(&self) -> Vec<HandleKey> {
        self.informers.lock().await.keys().cloned().collect()
    }

    /// Abort every watch and stop its subscription handle
    pub async fn shutdown(&self) {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }

        let mut informers = self.informers.lock().await;
        for informer in informers.values() {
            informer.stop();
        }
        info!(watches = informers.len(), "Watch cache shut down");
        informers.clear();
    }

    /// Running informer for a key, if its watch was started
    async fn running(&self, key: &HandleKey) -> Option<Arc<Informer>> {
        self.informers
            .lock()
            .await
            .get(key)
            .filter(|informer| !informer.is_stopped())
            .cloned()
    }

    /// Get or start the informer for a key, without waiting for sync
    async fn informer(&self, key: &HandleKey) -> Result<Arc<Informer>, CacheError> {
        if let Some(informer) = self.running(key).await {
            return Ok(informer);
        }

        let (resource, _caps) = discovery::pinned_kind(&self.client, &key.gvk).await?;

        let mut informers = self.informers.lock().await;
        if let Some(informer) = informers.get(key)
            && !informer.is_stopped()
        {
            // Another read started the watch while we were discovering
            return Ok(Arc::clone(informer));
        }

        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let informer = Arc::new(Informer::new(key.clone()));
        info!(handle = %key, plural = %resource.plural, "Starting watch");
        self.progress.watch_starting(&key.to_string());

        self.track_task(tokio::spawn(run_watch(
            api,
            Arc::clone(&informer),
            Arc::clone(&self.progress),
        )));

        informers.insert(key.clone(), Arc::clone(&informer));
        Ok(informer)
    }

    /// Keep a watch task for shutdown, dropping handles of finished ones
    fn track_task(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }
}

#[async_trait]
impl WatchCache for KubeCache {
    async fn get<O: CacheObject>(&self, key: &ObjectKey, dest: &mut O) -> Result<(), CacheError> {
        let handle = dest.handle_key()?;
        let informer = self.subscription(&handle).await?;
        read_object(&informer, key, dest)
    }

    async fn list<L: ObjectList>(
        &self,
        dest: &mut L,
        options: &ListOptions,
    ) -> Result<(), CacheError> {
        let handle = dest.list_kind().resolve()?;
        let informer = self.subscription(&handle).await?;
        read_list(&informer, dest, options)
    }

    async fn subscription(&self, key: &HandleKey) -> Result<Arc<Informer>, CacheError> {
        let informer = self.informer(key).await?;
        informer.wait_synced(self.options.sync_timeout).await?;
        Ok(informer)
    }
}

async fn run_watch(api: Api<DynamicObject>, informer: Arc<Informer>, progress: ProgressHandle) {
    let config = watcher::Config::default();
    match informer.key().representation {
        Representation::Metadata => {
            let stream = metadata_watcher(api, config).default_backoff();
            drive(stream, &informer, &progress, metadata_to_dynamic).await;
        }
        Representation::Structured | Representation::Unstructured => {
            let stream = watcher(api, config).default_backoff();
            drive(stream, &informer, &progress, std::convert::identity).await;
        }
    }
    debug!(handle = %informer.key(), "Watch stream ended");
    informer.stop();
}

/// Feed watcher events into an informer until the stream ends
async fn drive<K, S>(
    stream: S,
    informer: &Informer,
    progress: &ProgressReporter,
    into_dynamic: fn(K) -> DynamicObject,
) where
    S: Stream<Item = Result<watcher::Event<K>, watcher::Error>>,
{
    let handle = informer.key().to_string();
    let started = Instant::now();
    let mut stream = std::pin::pin!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Init) => informer.begin_resync(),
            Ok(watcher::Event::InitApply(obj)) => informer.apply(into_dynamic(obj)),
            Ok(watcher::Event::InitDone) => {
                let first = !informer.is_synced();
                informer.finish_resync();
                if first {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    info!(handle = %handle, objects = informer.len(), elapsed_ms, "Watch synced");
                    progress.watch_synced(&handle, informer.len(), elapsed_ms);
                } else {
                    debug!(handle = %handle, objects = informer.len(), "Watch relisted");
                }
            }
            Ok(watcher::Event::Apply(obj)) => informer.apply(into_dynamic(obj)),
            Ok(watcher::Event::Delete(obj)) => informer.delete(into_dynamic(obj)),
            Err(e) => {
                warn!(handle = %handle, error = %e, "Watch error, retrying with backoff");
                progress.watch_error(&handle, &e.to_string());
            }
        }
    }
}

fn metadata_to_dynamic(meta: PartialObjectMeta<DynamicObject>) -> DynamicObject {
    DynamicObject {
        types: meta.types,
        metadata: meta.metadata,
        data: serde_json::Value::Null,
    }
}
