// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::apply;
use crate::error::{LifecycleError, Result};
use crate::handlers::{Predicate, ResourceHandler, WatchOptions, WatchStream};
use crate::manifest::parse_manifest;
use crate::operation::OperationConfig;
use crate::pipeline::Visitor;
use crate::readiness;
use crate::registry::HandlerRegistry;
use crate::types::{describe, is_list_kind, kind_of};
use kube::api::PropagationPolicy;
use kube::core::DynamicObject;
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Lifecycle verbs for exactly one resource.
///
/// The handler is resolved on construction, so an unknown kind never reaches a
/// remote call. Every derivation returns a new operation.
#[derive(Clone)]
pub struct Operation {
    registry: HandlerRegistry,
    config: OperationConfig,
    item: DynamicObject,
    handler: Arc<dyn ResourceHandler>,
}

impl Operation {
    pub fn new(registry: &HandlerRegistry, config: OperationConfig, item: DynamicObject) -> Result<Self> {
        let handler = registry.resolve_for(&item)?;
        Ok(Self {
            registry: registry.clone(),
            config,
            item,
            handler,
        })
    }

    pub fn from_yaml(registry: &HandlerRegistry, config: OperationConfig, yaml: &str) -> Result<Self> {
        Self::new(registry, config, parse_manifest(yaml)?)
    }

    pub fn config(&self) -> &OperationConfig {
        &self.config
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

    pub fn accept(&self, visitor: Visitor) -> Self {
        self.with_config(self.config.accept(visitor))
    }

    /// Local item through the pipeline, or its remote state when reading from the server
    pub async fn get(&self) -> Result<Option<DynamicObject>> {
        let pipeline = self.config.pipeline();
        let local = pipeline.apply(self.handler.as_ref(), &self.item)?;
        if !self.config.from_server {
            return Ok(Some(local));
        }
        apply::reload(self.handler.as_ref(), &pipeline, &local).await
    }

    #[instrument(skip(self), fields(resource = %describe(&self.item)))]
    pub async fn create_or_replace(&self) -> Result<DynamicObject> {
        let target = self.config.pipeline().apply(self.handler.as_ref(), &self.item)?;
        if is_list_kind(kind_of(&target)) {
            return apply::create_or_replace_members(
                &self.registry,
                &self.config.delete_options(),
                self.config.deleting_existing,
                &target,
            )
            .await;
        }
        apply::create_or_replace(
            self.handler.as_ref(),
            &self.config.delete_options(),
            self.config.deleting_existing,
            &target,
        )
        .await
    }

    pub async fn apply(&self) -> Result<DynamicObject> {
        self.create_or_replace().await
    }

    /// Apply, then continue with an operation over the applied state
    pub async fn create_or_replace_and(&self) -> Result<Operation> {
        let applied = self.create_or_replace().await?;
        Ok(Self {
            item: applied,
            ..self.clone()
        })
    }

    #[instrument(skip(self), fields(resource = %describe(&self.item)))]
    pub async fn delete(&self) -> Result<bool> {
        apply::delete(
            self.handler.as_ref(),
            &self.config.pipeline(),
            &self.config.delete_options(),
            &self.item,
        )
        .await
    }

    pub async fn watch(&self, options: &WatchOptions) -> Result<WatchStream> {
        let target = self.config.pipeline().apply(self.handler.as_ref(), &self.item)?;
        self.handler
            .watch(target.namespace().as_deref(), &target, options)
            .await
    }

    pub async fn is_ready(&self) -> Result<bool> {
        Ok(self.get().await?.is_some_and(|r| readiness::is_ready(&r)))
    }

    #[instrument(skip(self), fields(resource = %describe(&self.item)))]
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<DynamicObject> {
        let target = self.wait_target().await?;
        self.handler
            .wait_until_ready(target.namespace().as_deref(), &target, timeout, &self.config.backoff)
            .await
    }

    #[instrument(skip(self, predicate), fields(resource = %describe(&self.item)))]
    pub async fn wait_until_condition(&self, predicate: Predicate, timeout: Duration) -> Result<DynamicObject> {
        let target = self.wait_target().await?;
        self.handler
            .wait_until_condition(
                target.namespace().as_deref(),
                &target,
                &predicate,
                timeout,
                &self.config.backoff,
            )
            .await
    }

    #[instrument(skip(self, predicate), fields(resource = %describe(&self.item)))]
    pub async fn wait_until_condition_from(
        &self,
        predicate: Predicate,
        resource_version: &str,
        timeout: Duration,
    ) -> Result<DynamicObject> {
        let target = self.wait_target().await?;
        self.handler
            .wait_until_condition_from(
                target.namespace().as_deref(),
                &target,
                &predicate,
                resource_version,
                timeout,
                &self.config.backoff,
            )
            .await
    }

    async fn wait_target(&self) -> Result<DynamicObject> {
        self.get()
            .await?
            .ok_or_else(|| LifecycleError::NotFound(describe(&self.item)))
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("item", &describe(&self.item))
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}
