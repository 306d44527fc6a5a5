// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Follow mode: print a read, wait for the live query to be invalidated,
//! then read again.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use k8slive::kubernetes::{
    CacheError, KubeCache, ListOptions, ObjectKey, PartialObjectMetadata,
    PartialObjectMetadataList, UnstructuredList, WatchCache, unstructured,
};
use k8slive::live::{LiveQuery, LiveQueryCache, LiveSignal};
use k8slive::progress::{ProgressHandle, ProgressUpdate, create_spinner};

use super::{Command, KindSpec, OutputFormat};
use crate::output::QueryResult;

/// What to read on every iteration
#[derive(Debug, Clone)]
pub enum Query {
    Get {
        kind: KindSpec,
        key: ObjectKey,
    },
    List {
        kind: KindSpec,
        options: ListOptions,
    },
}

impl Query {
    /// Build the query for a read command; get without a namespace reads a
    /// cluster-scoped object
    pub fn from_command(command: &Command, namespace: Option<&str>) -> Option<Self> {
        let query = match command {
            Command::Get { kind, name } => Query::Get {
                kind: kind.clone(),
                key: match namespace {
                    Some(ns) => ObjectKey::namespaced(ns, name),
                    None => ObjectKey::cluster(name),
                },
            },
            Command::List { kind, selector } => {
                let mut options = ListOptions {
                    namespace: namespace.map(String::from),
                    ..Default::default()
                };
                if let Some(selector) = selector {
                    options = options.with_label_selector(selector);
                }
                Query::List {
                    kind: kind.clone(),
                    options,
                }
            }
            Command::Config { .. } => return None,
        };
        Some(query)
    }
}

pub struct WatchOptions {
    pub output: OutputFormat,
    pub no_headers: bool,
    pub once: bool,
    pub metadata_only: bool,
    pub debounce: Duration,
}

/// Run a query until Ctrl-C (or once), re-printing it after every change
pub async fn run<C: WatchCache>(
    cache: &LiveQueryCache<C>,
    progress: Option<&ProgressHandle>,
    query: &Query,
    options: &WatchOptions,
) -> Result<()> {
    let mut iteration: u64 = 0;
    loop {
        let live = LiveQuery::new();
        let signal: Arc<dyn LiveSignal> = live.clone();

        let pending = read(cache, query, options.metadata_only, &signal);
        let result = match (iteration, progress) {
            (0, Some(progress)) => with_spinner(progress, pending).await,
            _ => pending.await,
        };

        match result {
            Ok(result) => {
                if iteration > 0 {
                    println!();
                }
                println!("{}", result.format(&options.output, options.no_headers));
            }
            Err(CacheError::NotFound { key, .. }) => {
                println!("{} not found", key);
                // Still wait for the kind to change so the object can appear
                if !options.once {
                    watch_kind(cache, query, options.metadata_only, &signal).await?;
                }
            }
            Err(e) => return Err(e.into()),
        }

        if options.once {
            live.end();
            return Ok(());
        }

        tokio::select! {
            _ = live.changed() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                live.end();
                return Ok(());
            }
        }

        tokio::time::sleep(options.debounce).await;
        live.end();
        iteration += 1;
        debug!(
            iteration,
            notifications = live.notifications(),
            "Query invalidated, re-running"
        );
    }
}

async fn read<C: WatchCache>(
    cache: &LiveQueryCache<C>,
    query: &Query,
    metadata_only: bool,
    signal: &Arc<dyn LiveSignal>,
) -> Result<QueryResult, CacheError> {
    match query {
        Query::Get { kind, key } if metadata_only => {
            let mut dest = PartialObjectMetadata::new(&kind.api_version, &kind.kind);
            cache.get(key, &mut dest, Some(signal)).await?;
            Ok(QueryResult::from_metadata([&dest]))
        }
        Query::Get { kind, key } => {
            let mut dest = unstructured(&kind.api_version, &kind.kind);
            cache.get(key, &mut dest, Some(signal)).await?;
            Ok(QueryResult::from_objects([&dest]))
        }
        Query::List { kind, options } if metadata_only => {
            let mut dest = PartialObjectMetadataList::new(&kind.api_version, &kind.list_kind());
            cache.list(&mut dest, options, Some(signal)).await?;
            Ok(QueryResult::from_metadata(&dest.items))
        }
        Query::List { kind, options } => {
            let mut dest = UnstructuredList::new(&kind.api_version, &kind.list_kind());
            cache.list(&mut dest, options, Some(signal)).await?;
            Ok(QueryResult::from_objects(&dest.items))
        }
    }
}

/// Track the whole kind of a query with a list read whose result is dropped
async fn watch_kind<C: WatchCache>(
    cache: &LiveQueryCache<C>,
    query: &Query,
    metadata_only: bool,
    signal: &Arc<dyn LiveSignal>,
) -> Result<(), CacheError> {
    let kind = match query {
        Query::Get { kind, .. } | Query::List { kind, .. } => kind,
    };
    let options = ListOptions::default();
    if metadata_only {
        let mut dest = PartialObjectMetadataList::new(&kind.api_version, &kind.list_kind());
        cache.list(&mut dest, &options, Some(signal)).await
    } else {
        let mut dest = UnstructuredList::new(&kind.api_version, &kind.list_kind());
        cache.list(&mut dest, &options, Some(signal)).await
    }
}

/// Show watch startup progress while a read waits for its watch to sync
async fn with_spinner<T>(progress: &ProgressHandle, fut: impl Future<Output = T>) -> T {
    let spinner = create_spinner("Starting watch...");
    let mut progress_rx = progress.subscribe();
    let mut fut = Box::pin(fut);

    let result = loop {
        tokio::select! {
            biased;
            update = progress_rx.recv() => {
                match update {
                    Ok(ProgressUpdate::WatchStarting { handle }) => {
                        spinner.set_message(format!("Watching {}...", handle));
                    }
                    Ok(ProgressUpdate::WatchSynced { handle, objects, .. }) => {
                        spinner.set_message(format!("{}: {} objects", handle, objects));
                    }
                    Ok(ProgressUpdate::WatchError { handle, error }) => {
                        spinner.set_message(format!("{}: {} (retrying)", handle, error));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break (&mut fut).await,
                }
            }
            result = &mut fut => break result,
        }
    };

    spinner.finish_and_clear();
    result
}

/// Progress reporter of a kube-backed live cache
pub fn kube_progress(cache: &LiveQueryCache<KubeCache>) -> ProgressHandle {
    Arc::clone(cache.inner().progress())
}
