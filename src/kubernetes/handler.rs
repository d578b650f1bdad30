// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource handler backed by the Kubernetes API for one discovered resource type.

use crate::error::{LifecycleError, Result};
use crate::handlers::{DeleteOptions, Predicate, ResourceHandler, WatchOptions, WatchStream};
use crate::operation::RetryBackoff;
use crate::readiness;
use crate::types::{describe, kind_of};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use kube::api::{Api, DeleteParams, PostParams, WatchEvent, WatchParams};
use kube::core::{ApiResource, DynamicObject};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Resource version a watch starts from when nothing has been observed yet
const ANY_VERSION: &str = "0";

#[derive(Clone)]
pub struct DynamicHandler {
    client: Client,
    resource: ApiResource,
    namespaced: bool,
}

impl DynamicHandler {
    pub fn new(client: Client, resource: ApiResource, namespaced: bool) -> Self {
        Self {
            client,
            resource,
            namespaced,
        }
    }

    fn api(&self, namespace: Option<&str>) -> Api<DynamicObject> {
        if !self.namespaced {
            return Api::all_with(self.client.clone(), &self.resource);
        }
        match namespace {
            Some(ns) if !ns.is_empty() => Api::namespaced_with(self.client.clone(), ns, &self.resource),
            _ => Api::default_namespaced_with(self.client.clone(), &self.resource),
        }
    }

    /// Watch `name` until `predicate` holds, reconnecting with backoff when the
    /// stream ends or fails. Without a starting version the current state is
    /// read first; a 410 Gone drops the version so the state is read again.
    async fn watch_until(
        &self,
        api: &Api<DynamicObject>,
        name: &str,
        predicate: &Predicate,
        from_version: Option<String>,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        let params = WatchParams::default().fields(&format!("metadata.name={}", name));
        let mut version = from_version;
        let mut delay = backoff.initial;

        loop {
            let since = match version.take() {
                Some(v) => v,
                None => match api.get_opt(name).await? {
                    Some(current) if predicate(&current) => return Ok(current),
                    Some(current) => current
                        .resource_version()
                        .unwrap_or_else(|| ANY_VERSION.to_string()),
                    None => ANY_VERSION.to_string(),
                },
            };

            let mut last_seen = Some(since.clone());
            match api.watch(&params, &since).await {
                Ok(stream) => {
                    let mut stream = stream.boxed();
                    loop {
                        match stream.try_next().await {
                            Ok(Some(WatchEvent::Added(obj))) | Ok(Some(WatchEvent::Modified(obj))) => {
                                if predicate(&obj) {
                                    return Ok(obj);
                                }
                                last_seen = obj.resource_version();
                                delay = backoff.initial;
                            }
                            Ok(Some(WatchEvent::Deleted(obj))) => {
                                debug!("{} was deleted while waiting", describe(&obj));
                                last_seen = obj.resource_version();
                            }
                            Ok(Some(WatchEvent::Bookmark(bookmark))) => {
                                last_seen = Some(bookmark.metadata.resource_version);
                            }
                            Ok(Some(WatchEvent::Error(e))) if e.code == 410 => {
                                debug!("Watch on {} expired, reading current state again", name);
                                last_seen = None;
                                break;
                            }
                            Ok(Some(WatchEvent::Error(e))) => {
                                warn!("Watch on {} returned an error: {}", name, e.message);
                                break;
                            }
                            Ok(None) => {
                                debug!("Watch on {} closed", name);
                                break;
                            }
                            Err(kube::Error::Api(e)) if e.code == 410 => {
                                debug!("Watch on {} expired, reading current state again", name);
                                last_seen = None;
                                break;
                            }
                            Err(e) => {
                                warn!("Watch on {} failed: {}", name, e);
                                break;
                            }
                        }
                    }
                }
                Err(kube::Error::Api(e)) if e.code == 410 => last_seen = None,
                Err(e) => warn!("Cannot watch {}: {}", name, e),
            }

            version = last_seen;
            sleep(delay).await;
            delay = backoff.next(delay);
        }
    }

    async fn wait_within(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        predicate: &Predicate,
        from_version: Option<String>,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        let api = self.api(namespace);
        let name = resource.name_any();
        let wait = self.watch_until(&api, &name, predicate, from_version, backoff);
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(LifecycleError::timed_out(vec![resource.clone()], timeout)),
        }
    }
}

#[async_trait]
impl ResourceHandler for DynamicHandler {
    #[instrument(skip_all, fields(resource = %describe(resource)))]
    async fn create(&self, namespace: Option<&str>, resource: &DynamicObject) -> Result<DynamicObject> {
        Ok(self
            .api(namespace)
            .create(&PostParams::default(), resource)
            .await?)
    }

    #[instrument(skip_all, fields(resource = %describe(resource)))]
    async fn replace(&self, namespace: Option<&str>, resource: &DynamicObject) -> Result<DynamicObject> {
        Ok(self
            .api(namespace)
            .replace(&resource.name_any(), &PostParams::default(), resource)
            .await?)
    }

    #[instrument(skip_all, fields(resource = %describe(resource)))]
    async fn delete(
        &self,
        namespace: Option<&str>,
        options: &DeleteOptions,
        resource: &DynamicObject,
    ) -> Result<bool> {
        let params = DeleteParams {
            propagation_policy: options.propagation_policy.clone(),
            grace_period_seconds: options.grace_period_seconds,
            ..Default::default()
        };
        match self.api(namespace).delete(&resource.name_any(), &params).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!("{} not found, nothing to delete", describe(resource));
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reload(&self, namespace: Option<&str>, resource: &DynamicObject) -> Result<Option<DynamicObject>> {
        Ok(self.api(namespace).get_opt(&resource.name_any()).await?)
    }

    async fn watch(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        options: &WatchOptions,
    ) -> Result<WatchStream> {
        let params = options
            .params
            .clone()
            .fields(&format!("metadata.name={}", resource.name_any()));
        let version = options
            .resource_version
            .clone()
            .or_else(|| resource.resource_version())
            .unwrap_or_else(|| ANY_VERSION.to_string());
        let stream = self.api(namespace).watch(&params, &version).await?;
        Ok(stream.map_err(LifecycleError::from).boxed())
    }

    async fn wait_until_ready(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        if !readiness::supports_readiness(kind_of(resource)) {
            return Err(LifecycleError::not_supported("readiness", resource));
        }
        let predicate: Predicate = Arc::new(readiness::is_ready);
        self.wait_within(namespace, resource, &predicate, None, timeout, backoff)
            .await
    }

    async fn wait_until_condition(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        predicate: &Predicate,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        self.wait_within(namespace, resource, predicate, None, timeout, backoff)
            .await
    }

    async fn wait_until_condition_from(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        predicate: &Predicate,
        resource_version: &str,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        self.wait_within(
            namespace,
            resource,
            predicate,
            Some(resource_version.to_string()),
            timeout,
            backoff,
        )
        .await
    }
}
