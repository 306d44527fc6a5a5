// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use cli::{Args, Command};
use cli::watch::{Query, WatchOptions};
use k8slive::kubernetes::{KubeCache, KubeCacheOptions, connect};
use k8slive::live::LiveQueryCache;

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = config::base_dir()
        .map(|p| p.join("log"))
        .unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // 10MB per file, 5 files, also rotated daily
    let log_path = log_dir.join("k8slive.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024);

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let (non_blocking, guard) = file_appender.get_non_blocking_appender();
    // Leak the guard to keep the background writer alive
    std::mem::forget(guard);

    let filter = if verbose {
        "k8slive=debug"
    } else {
        "k8slive=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs); fails only if one is already set
    let provider_installed = rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_ok();

    let args = Args::parse();
    init_logging(args.verbose);
    if !provider_installed {
        warn!("A rustls crypto provider was already installed");
    }

    let config = match config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {:#}, using defaults", e);
            config::Config::default()
        }
    };

    run(&args, &config).await
}

async fn run(args: &Args, config: &config::Config) -> Result<()> {
    if let Command::Config {
        default_namespace,
        sync_timeout_secs,
        debounce_ms,
    } = &args.command
    {
        return update_config(config, default_namespace, *sync_timeout_secs, *debounce_ms);
    }

    let namespace = args
        .namespace
        .as_deref()
        .or(config.default_namespace.as_deref());
    let Some(query) = Query::from_command(&args.command, namespace) else {
        return Ok(());
    };

    let client = connect(args.context.as_deref()).await?;
    let cache = LiveQueryCache::new(KubeCache::new(
        client,
        KubeCacheOptions {
            sync_timeout: config.sync_timeout(),
        },
    ));
    let progress = cli::watch::kube_progress(&cache);

    info!(query = ?query, once = args.once, "Starting");
    let options = WatchOptions {
        output: args.output.clone(),
        no_headers: args.no_headers,
        once: args.once,
        metadata_only: args.metadata_only,
        debounce: config.debounce(),
    };
    let result = cli::watch::run(&cache, Some(&progress), &query, &options).await;

    cache.inner().shutdown().await;
    result
}

/// Apply any given settings, save if something changed, and print the result
fn update_config(
    current: &config::Config,
    default_namespace: &Option<String>,
    sync_timeout_secs: Option<u64>,
    debounce_ms: Option<u64>,
) -> Result<()> {
    let mut config = current.clone();
    if let Some(ns) = default_namespace {
        // An empty value clears the default
        config.default_namespace = Some(ns.clone()).filter(|ns| !ns.is_empty());
    }
    if let Some(secs) = sync_timeout_secs {
        config.sync_timeout_secs = secs;
    }
    if let Some(ms) = debounce_ms {
        config.debounce_ms = ms;
    }

    if config != *current {
        config.save()?;
        info!(path = %config::Config::config_path()?.display(), "Config saved");
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
