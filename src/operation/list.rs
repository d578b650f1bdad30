// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::apply;
use crate::error::Result;
use crate::handlers::Predicate;
use crate::manifest::parse_manifests;
use crate::operation::OperationConfig;
use crate::pipeline::Visitor;
use crate::readiness;
use crate::registry::HandlerRegistry;
use crate::types::flatten;
use crate::wait::BatchWaiter;
use kube::api::PropagationPolicy;
use kube::core::DynamicObject;
use std::time::Duration;
use tracing::{info, instrument};

/// Lifecycle verbs over an ordered batch of resources.
///
/// Container resources are expanded into their members on construction.
/// Handlers are resolved per verb; a verb that talks to the cluster resolves
/// all of them before the first request.
#[derive(Debug, Clone)]
pub struct ListOperation {
    registry: HandlerRegistry,
    config: OperationConfig,
    items: Vec<DynamicObject>,
}

impl ListOperation {
    pub fn new(registry: &HandlerRegistry, config: OperationConfig, items: Vec<DynamicObject>) -> Result<Self> {
        Ok(Self {
            registry: registry.clone(),
            config,
            items: flatten(items)?,
        })
    }

    pub fn from_yaml(registry: &HandlerRegistry, config: OperationConfig, yaml: &str) -> Result<Self> {
        Self::new(registry, config, parse_manifests(yaml)?)
    }

    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    pub fn items(&self) -> &[DynamicObject] {
        &self.items
    }

    pub fn with_config(&self, config: OperationConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    pub fn with_fallback_namespace(&self, namespace: &str) -> Self {
        self.with_config(self.config.with_fallback_namespace(namespace))
    }

    pub fn in_namespace(&self, namespace: &str) -> Self {
        self.with_config(self.config.in_namespace(namespace))
    }

    pub fn from_server(&self) -> Self {
        self.with_config(self.config.from_server())
    }

    pub fn deleting_existing(&self) -> Self {
        self.with_config(self.config.deleting_existing())
    }

    pub fn cascading(&self, cascading: bool) -> Self {
        self.with_config(self.config.cascading(cascading))
    }

    pub fn with_grace_period(&self, seconds: u32) -> Self {
        self.with_config(self.config.with_grace_period(seconds))
    }

    pub fn with_propagation_policy(&self, policy: PropagationPolicy) -> Self {
        self.with_config(self.config.with_propagation_policy(policy))
    }

    pub fn with_wait_retry_backoff(&self, initial: Duration, multiplier: f64) -> Self {
        self.with_config(self.config.with_wait_retry_backoff(initial, multiplier))
    }

    pub fn with_wait_concurrency(&self, limit: usize) -> Self {
        self.with_config(self.config.with_wait_concurrency(limit))
    }

    pub fn accept(&self, visitor: Visitor) -> Self {
        self.with_config(self.config.accept(visitor))
    }

    /// Items through the pipeline, or their remote state when reading from the server.
    /// Resources missing remotely are left out. Reloads run one after another.
    pub async fn get(&self) -> Result<Vec<DynamicObject>> {
        let pipeline = self.config.pipeline();
        let targets = apply::prepare(&self.registry, &pipeline, &self.items)?;
        if !self.config.from_server {
            return Ok(targets.into_iter().map(|(_, resource)| resource).collect());
        }

        let mut current = Vec::with_capacity(targets.len());
        for (handler, resource) in &targets {
            if let Some(reloaded) = apply::reload(handler.as_ref(), &pipeline, resource).await? {
                current.push(reloaded);
            }
        }
        Ok(current)
    }

    /// Apply every item in order. A fatal error is returned as
    /// [`crate::LifecycleError::BatchAborted`] carrying the items applied so far.
    #[instrument(skip(self), fields(count = self.items.len()))]
    pub async fn create_or_replace(&self) -> Result<Vec<DynamicObject>> {
        let targets = apply::prepare(&self.registry, &self.config.pipeline(), &self.items)?;
        let applied = apply::create_or_replace_all(
            &targets,
            &self.config.delete_options(),
            self.config.deleting_existing,
        )
        .await?;
        info!("Applied {} resource(s)", applied.len());
        Ok(applied)
    }

    pub async fn apply(&self) -> Result<Vec<DynamicObject>> {
        self.create_or_replace().await
    }

    /// Apply, then continue with an operation over the applied state
    pub async fn create_or_replace_and(&self) -> Result<ListOperation> {
        let applied = self.create_or_replace().await?;
        Ok(Self {
            items: applied,
            ..self.clone()
        })
    }

    pub async fn delete(&self) -> Result<bool> {
        apply::delete_all(
            &self.registry,
            &self.config.pipeline(),
            &self.config.delete_options(),
            &self.items,
        )
        .await
    }

    pub async fn is_ready(&self) -> Result<bool> {
        Ok(self.get().await?.iter().all(readiness::is_ready))
    }

    /// Ready items in input order. Kinds without a readiness concept are left
    /// out; only running out of time fails the call.
    #[instrument(skip(self), fields(count = self.items.len()))]
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<Vec<DynamicObject>> {
        let items = self.get().await?;
        self.waiter(timeout).ready(items).await?.into_ready()
    }

    /// Every item must satisfy `predicate` before `timeout`
    #[instrument(skip(self, predicate), fields(count = self.items.len()))]
    pub async fn wait_until_condition(&self, predicate: Predicate, timeout: Duration) -> Result<Vec<DynamicObject>> {
        let items = self.get().await?;
        self.waiter(timeout)
            .condition(items, predicate)
            .await?
            .into_matched()
    }

    #[instrument(skip(self, predicate), fields(count = self.items.len()))]
    pub async fn wait_until_condition_from(
        &self,
        predicate: Predicate,
        resource_version: &str,
        timeout: Duration,
    ) -> Result<Vec<DynamicObject>> {
        let items = self.get().await?;
        self.waiter(timeout)
            .condition_from(items, predicate, resource_version)
            .await?
            .into_matched()
    }

    fn waiter(&self, timeout: Duration) -> BatchWaiter {
        BatchWaiter::new(self.registry.clone(), timeout)
            .with_backoff(self.config.backoff)
            .with_concurrency(self.config.wait_concurrency)
    }
}
