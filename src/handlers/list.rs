// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Handler for container kinds (`List`, `*List`), delegating to the members' handlers.

use crate::error::{LifecycleError, Result};
use crate::handlers::{DeleteOptions, Predicate, ResourceHandler, WatchOptions, WatchStream};
use crate::operation::RetryBackoff;
use crate::pipeline::ResourceBuilder;
use crate::registry::HandlerRegistry;
use crate::types::{describe, list_items, with_items};
use crate::wait::BatchWaiter;
use async_trait::async_trait;
use kube::core::DynamicObject;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct ListHandler {
    registry: HandlerRegistry,
}

impl ListHandler {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    fn members(&self, list: &DynamicObject) -> Result<Vec<DynamicObject>> {
        list_items(list).unwrap_or_else(|| {
            Err(LifecycleError::InvalidResource(format!(
                "{} has no items",
                describe(list)
            )))
        })
    }

    fn waiter(&self, timeout: Duration, backoff: &RetryBackoff) -> BatchWaiter {
        BatchWaiter::new(self.registry.clone(), timeout).with_backoff(*backoff)
    }
}

fn member_namespace<'a>(item: &'a DynamicObject, namespace: Option<&'a str>) -> Option<&'a str> {
    item.metadata.namespace.as_deref().or(namespace)
}

#[async_trait]
impl ResourceHandler for ListHandler {
    #[instrument(skip_all, fields(list = %describe(list)))]
    async fn create(&self, namespace: Option<&str>, list: &DynamicObject) -> Result<DynamicObject> {
        let mut created = Vec::new();
        for mut item in self.members(list)? {
            item.metadata.resource_version = None;
            let handler = self.registry.resolve_for(&item)?;
            created.push(handler.create(member_namespace(&item, namespace), &item).await?);
        }
        debug!("Created {} list members", created.len());
        with_items(list, &created)
    }

    #[instrument(skip_all, fields(list = %describe(list)))]
    async fn replace(&self, namespace: Option<&str>, list: &DynamicObject) -> Result<DynamicObject> {
        let mut replaced = Vec::new();
        for item in self.members(list)? {
            let handler = self.registry.resolve_for(&item)?;
            replaced.push(handler.replace(member_namespace(&item, namespace), &item).await?);
        }
        with_items(list, &replaced)
    }

    async fn delete(
        &self,
        namespace: Option<&str>,
        options: &DeleteOptions,
        list: &DynamicObject,
    ) -> Result<bool> {
        for item in self.members(list)? {
            let handler = self.registry.resolve_for(&item)?;
            if !handler
                .delete(member_namespace(&item, namespace), options, &item)
                .await?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn reload(&self, namespace: Option<&str>, list: &DynamicObject) -> Result<Option<DynamicObject>> {
        let mut reloaded = Vec::new();
        for item in self.members(list)? {
            let handler = self.registry.resolve_for(&item)?;
            if let Some(current) = handler.reload(member_namespace(&item, namespace), &item).await? {
                reloaded.push(current);
            }
        }
        with_items(list, &reloaded).map(Some)
    }

    fn edit(&self, list: &DynamicObject) -> Result<ResourceBuilder> {
        Ok(ResourceBuilder::container(list, &self.members(list)?))
    }

    async fn watch(
        &self,
        _namespace: Option<&str>,
        list: &DynamicObject,
        _options: &WatchOptions,
    ) -> Result<WatchStream> {
        Err(LifecycleError::not_supported("watch", list))
    }

    async fn wait_until_ready(
        &self,
        _namespace: Option<&str>,
        list: &DynamicObject,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        let ready = self
            .waiter(timeout, backoff)
            .ready(self.members(list)?)
            .await?
            .into_ready()?;
        with_items(list, &ready)
    }

    async fn wait_until_condition(
        &self,
        _namespace: Option<&str>,
        list: &DynamicObject,
        predicate: &Predicate,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        let matched = self
            .waiter(timeout, backoff)
            .condition(self.members(list)?, predicate.clone())
            .await?
            .into_matched()?;
        with_items(list, &matched)
    }

    async fn wait_until_condition_from(
        &self,
        _namespace: Option<&str>,
        list: &DynamicObject,
        predicate: &Predicate,
        resource_version: &str,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        let matched = self
            .waiter(timeout, backoff)
            .condition_from(self.members(list)?, predicate.clone(), resource_version)
            .await?
            .into_matched()?;
        with_items(list, &matched)
    }
}
