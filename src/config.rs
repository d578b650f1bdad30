// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::DEFAULT_NAMESPACE;
use crate::operation::OperationConfig;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Command line tool configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Manifest file holding the resources to apply
    pub manifest_path: String,
    /// Namespace for resources that do not specify one
    pub default_namespace: String,
    pub delete_existing: bool,
    /// Wait for readiness after applying when set
    pub wait_timeout: Option<Duration>,
    pub wait_concurrency: Option<usize>,
    /// Explicit kubeconfig file, otherwise the inferred configuration is used
    pub kubeconfig_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let manifest_path = lookup("MANIFEST_PATH").context("MANIFEST_PATH environment variable not set")?;
        let default_namespace = lookup("DEFAULT_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let delete_existing = lookup("DELETE_EXISTING")
            .map(|v| v.parse::<bool>())
            .transpose()
            .context("DELETE_EXISTING must be true or false")?
            .unwrap_or(false);
        let wait_timeout = lookup("WAIT_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("WAIT_TIMEOUT_SECS must be a number of seconds")?
            .map(Duration::from_secs);
        let wait_concurrency = lookup("WAIT_CONCURRENCY")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("WAIT_CONCURRENCY must be a positive number")?;
        let kubeconfig_path = lookup("KUBECONFIG_PATH");

        Ok(Config {
            manifest_path,
            default_namespace,
            delete_existing,
            wait_timeout,
            wait_concurrency,
            kubeconfig_path,
        })
    }

    /// Operation settings derived from this configuration
    pub fn operation_config(&self) -> OperationConfig {
        let mut config = OperationConfig::new(&self.default_namespace);
        if self.delete_existing {
            config = config.deleting_existing();
        }
        if let Some(limit) = self.wait_concurrency {
            config = config.with_wait_concurrency(limit);
        }
        config
    }
}
