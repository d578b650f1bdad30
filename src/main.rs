// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kube_lifecycle::config::Config;
use kube_lifecycle::kubernetes::create_client;
use kube_lifecycle::{describe, HandlerRegistry, ListOperation};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting kube-lifecycle");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: manifest={}, default_namespace={}",
        config.manifest_path, config.default_namespace
    );

    // Create Kubernetes client
    let client = create_client(&config).await?;
    info!("Connected to Kubernetes cluster");

    let registry = HandlerRegistry::discover(&client).await?;

    let manifest = tokio::fs::read_to_string(&config.manifest_path)
        .await
        .with_context(|| format!("Failed to read manifest {}", config.manifest_path))?;
    let operation = ListOperation::from_yaml(&registry, config.operation_config(), &manifest)?;

    let applied = operation.create_or_replace_and().await?;
    for resource in applied.items() {
        info!("Applied {}", describe(resource));
    }

    if let Some(timeout) = config.wait_timeout {
        info!("Waiting up to {:?} for {} resource(s) to become ready", timeout, applied.items().len());
        let ready = applied.wait_until_ready(timeout).await?;
        info!("{} resource(s) ready", ready.len());
    }

    Ok(())
}
