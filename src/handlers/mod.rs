// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-kind remote operations the generic engine dispatches to.

pub mod list;

pub use list::ListHandler;

use crate::error::{LifecycleError, Result};
use crate::operation::RetryBackoff;
use crate::pipeline::ResourceBuilder;
use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::api::{PropagationPolicy, WatchEvent, WatchParams};
use kube::core::DynamicObject;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// Boolean condition evaluated against the observed state of a resource
pub type Predicate = Arc<dyn Fn(&DynamicObject) -> bool + Send + Sync>;

/// Stream of watch events for a single resource; dropping it closes the watch
pub type WatchStream = BoxStream<'static, Result<WatchEvent<DynamicObject>>>;

/// How a delete propagates to dependents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub propagation_policy: Option<PropagationPolicy>,
    pub grace_period_seconds: Option<u32>,
}

/// Where a watch starts and which server-side parameters it carries
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub resource_version: Option<String>,
    pub params: WatchParams,
}

/// Remote primitives for one resource kind.
///
/// `namespace` is the namespace resolved by the mutation pipeline; cluster
/// scoped kinds ignore it.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn create(&self, namespace: Option<&str>, resource: &DynamicObject) -> Result<DynamicObject>;

    async fn replace(&self, namespace: Option<&str>, resource: &DynamicObject) -> Result<DynamicObject>;

    /// Returns false when there was nothing to delete
    async fn delete(
        &self,
        namespace: Option<&str>,
        options: &DeleteOptions,
        resource: &DynamicObject,
    ) -> Result<bool>;

    /// Current remote state, `None` when the resource does not exist
    async fn reload(&self, namespace: Option<&str>, resource: &DynamicObject) -> Result<Option<DynamicObject>>;

    /// Editable staging copy used by the mutation pipeline
    fn edit(&self, resource: &DynamicObject) -> Result<ResourceBuilder> {
        Ok(ResourceBuilder::new(resource))
    }

    async fn watch(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        options: &WatchOptions,
    ) -> Result<WatchStream>;

    /// Block until the kind-specific readiness predicate holds.
    /// Kinds without a readiness concept fail with `NotSupported`.
    async fn wait_until_ready(
        &self,
        _namespace: Option<&str>,
        resource: &DynamicObject,
        _timeout: Duration,
        _backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        Err(LifecycleError::not_supported("readiness", resource))
    }

    async fn wait_until_condition(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        predicate: &Predicate,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        poll_until_condition(self, namespace, resource, predicate, timeout, backoff).await
    }

    /// Same as [`ResourceHandler::wait_until_condition`], observing changes
    /// after `resource_version`
    async fn wait_until_condition_from(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        predicate: &Predicate,
        _resource_version: &str,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> Result<DynamicObject> {
        self.wait_until_condition(namespace, resource, predicate, timeout, backoff)
            .await
    }
}

/// Reload the resource with exponential backoff until `predicate` holds or `timeout` elapses
pub async fn poll_until_condition<H: ResourceHandler + ?Sized>(
    handler: &H,
    namespace: Option<&str>,
    resource: &DynamicObject,
    predicate: &Predicate,
    timeout: Duration,
    backoff: &RetryBackoff,
) -> Result<DynamicObject> {
    let poll = async {
        let mut delay = backoff.initial;
        loop {
            if let Some(current) = handler.reload(namespace, resource).await? {
                if predicate(&current) {
                    return Ok::<_, LifecycleError>(current);
                }
            }
            trace!("Condition not met yet, polling again in {:?}", delay);
            sleep(delay).await;
            delay = backoff.next(delay);
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(LifecycleError::timed_out(vec![resource.clone()], timeout)),
    }
}
