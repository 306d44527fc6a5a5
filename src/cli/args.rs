// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "k8slive")]
#[command(author, version, about = "Watch Kubernetes resources and re-run reads when they change")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Kubernetes context to use (kubeconfig default if omitted)
    #[arg(short, long, value_name = "CONTEXT", global = true)]
    pub context: Option<String>,

    /// Namespace to read from (config default, then all namespaces for lists)
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Omit column headers in output
    #[arg(long, global = true)]
    pub no_headers: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the result once and exit instead of following changes
    #[arg(long, global = true)]
    pub once: bool,

    /// Watch object metadata only (no spec or status)
    #[arg(long, global = true)]
    pub metadata_only: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show one object and re-print it whenever it changes
    Get {
        /// Resource kind as [group/]version/Kind, e.g. apps/v1/Deployment
        kind: KindSpec,
        /// Object name
        name: String,
    },

    /// List objects of a kind and re-print whenever any of them changes
    List {
        /// Resource kind as [group/]version/Kind, e.g. v1/ConfigMap
        kind: KindSpec,
        /// Label selector, e.g. app=web,tier!=db
        #[arg(short = 'l', long)]
        selector: Option<String>,
    },

    /// Show or update ~/.k8slive/config.json
    Config {
        /// Namespace used when --namespace is not given
        #[arg(long)]
        default_namespace: Option<String>,
        /// Seconds a read waits for a new watch to sync
        #[arg(long)]
        sync_timeout_secs: Option<u64>,
        /// Quiet period in milliseconds before re-running a changed query
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
    Yaml,
}

/// Resource kind given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSpec {
    pub api_version: String,
    pub kind: String,
}

impl KindSpec {
    /// Kind of the collection type (`Widget` -> `WidgetList`)
    pub fn list_kind(&self) -> String {
        format!("{}List", self.kind)
    }
}

impl FromStr for KindSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(format!("invalid kind '{}': empty segment", s));
        }
        let (api_version, kind) = match parts.as_slice() {
            [version, kind] => (version.to_string(), kind.to_string()),
            [group, version, kind] => (format!("{}/{}", group, version), kind.to_string()),
            _ => {
                return Err(format!(
                    "invalid kind '{}': expected [group/]version/Kind",
                    s
                ));
            }
        };
        Ok(Self { api_version, kind })
    }
}

impl fmt::Display for KindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}
