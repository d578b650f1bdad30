// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster client creation and kubeconfig utilities

use crate::config::Config;
use crate::error::{LifecycleError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use tracing::{info, instrument};

/// Create a client from the configured kubeconfig file, or the inferred configuration
#[instrument(skip(config))]
pub async fn create_client(config: &Config) -> Result<Client> {
    match config.kubeconfig_path.as_deref() {
        Some(path) => {
            info!("Using kubeconfig from {}", path);
            let kubeconfig = tokio::fs::read_to_string(path).await.map_err(|e| {
                LifecycleError::KubeconfigError(format!("Failed to read kubeconfig {}: {}", path, e))
            })?;
            create_client_from_kubeconfig(&kubeconfig).await
        }
        None => Ok(Client::try_default().await?),
    }
}

/// Create a Kubernetes client from a kubeconfig string
pub async fn create_client_from_kubeconfig(kubeconfig: &str) -> Result<Client> {
    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| LifecycleError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))?;

    let client_config = kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
        .await
        .map_err(|e| LifecycleError::KubeconfigError(format!("Failed to create config: {}", e)))?;

    Client::try_from(client_config)
        .map_err(|e| LifecycleError::KubeconfigError(format!("Failed to create client: {}", e)))
}
