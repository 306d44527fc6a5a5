// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result, anyhow};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::time::Duration;
use tracing::info;

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// No read timeout: watch connections are long-lived and idle between events
const READ_TIMEOUT: Option<Duration> = None;

/// Create a client for a kubeconfig context, or the current context if None
pub async fn connect(context: Option<&str>) -> Result<Client> {
    let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;

    let context_name = context
        .map(String::from)
        .or_else(|| kubeconfig.current_context.clone())
        .ok_or_else(|| anyhow!("No context specified and no current context in kubeconfig"))?;

    if !kubeconfig.contexts.iter().any(|c| c.name == context_name) {
        return Err(anyhow!("Context '{}' not found in kubeconfig", context_name));
    }

    let mut config = Config::from_custom_kubeconfig(
        kubeconfig,
        &KubeConfigOptions {
            context: Some(context_name.clone()),
            ..Default::default()
        },
    )
    .await
    .with_context(|| format!("Failed to load kubeconfig for context '{}'", context_name))?;

    config.connect_timeout = Some(CONNECT_TIMEOUT);
    config.read_timeout = READ_TIMEOUT;

    let client = Client::try_from(config)
        .with_context(|| format!("Failed to create client for context '{}'", context_name))?;

    info!(context = %context_name, "Connected");
    Ok(client)
}
