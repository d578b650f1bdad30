// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Concurrent batch waits under one shared deadline.
//!
//! Every resource gets its own task in a [`JoinSet`]; each task reports only its
//! own `(index, outcome)` slot, so results are partitioned in input order no
//! matter which task finishes first. When the deadline passes the remaining
//! tasks are aborted.

use crate::error::{LifecycleError, Result};
use crate::handlers::{Predicate, ResourceHandler};
use crate::operation::RetryBackoff;
use crate::registry::HandlerRegistry;
use crate::types::{describe, kind_of};
use kube::core::DynamicObject;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

/// Result of waiting on one resource
#[derive(Debug)]
pub enum WaitOutcome {
    /// The condition held; carries the observed state
    Matched(DynamicObject),
    /// The kind has no readiness concept, excluded without failing
    Skipped(DynamicObject),
    /// Still pending at the deadline (`error` is `None`) or failed
    Unmatched {
        resource: DynamicObject,
        error: Option<LifecycleError>,
    },
}

impl WaitOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, WaitOutcome::Matched(_))
    }

    fn is_timeout(&self) -> bool {
        matches!(
            self,
            WaitOutcome::Unmatched {
                error: Some(LifecycleError::WaitTimeout { .. }),
                ..
            }
        )
    }
}

/// Outcomes of a batch wait, in the order the resources were given
#[derive(Debug)]
pub struct WaitReport {
    outcomes: Vec<WaitOutcome>,
    timed_out: bool,
    timeout: Duration,
}

impl WaitReport {
    fn new(outcomes: Vec<WaitOutcome>, timed_out: bool, timeout: Duration) -> Self {
        Self {
            outcomes,
            timed_out,
            timeout,
        }
    }

    pub fn outcomes(&self) -> &[WaitOutcome] {
        &self.outcomes
    }

    /// True when the shared deadline elapsed before every resource settled
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn matched(&self) -> Vec<DynamicObject> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                WaitOutcome::Matched(resource) => Some(resource.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn unmatched(&self) -> Vec<DynamicObject> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                WaitOutcome::Unmatched { resource, .. } => Some(resource.clone()),
                _ => None,
            })
            .collect()
    }

    /// Resources that had not settled when time ran out
    pub fn pending(&self) -> Vec<DynamicObject> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, WaitOutcome::Unmatched { error: None, .. }) || outcome.is_timeout())
            .filter_map(|outcome| match outcome {
                WaitOutcome::Unmatched { resource, .. } => Some(resource.clone()),
                _ => None,
            })
            .collect()
    }

    /// Readiness semantics: skipped and failed resources are left out of the
    /// result; only running out of time is an error, carrying the pending ones.
    pub fn into_ready(self) -> Result<Vec<DynamicObject>> {
        if self.timed_out {
            return Err(LifecycleError::timed_out(self.pending(), self.timeout));
        }
        Ok(self.matched())
    }

    /// Condition semantics: every resource must have matched
    pub fn into_matched(self) -> Result<Vec<DynamicObject>> {
        if self.outcomes.iter().all(WaitOutcome::is_matched) {
            return Ok(self.matched());
        }
        let unmatched = self
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                WaitOutcome::Matched(_) => None,
                WaitOutcome::Skipped(resource) | WaitOutcome::Unmatched { resource, .. } => {
                    Some(resource.clone())
                }
            })
            .collect();
        Err(LifecycleError::timed_out(unmatched, self.timeout))
    }
}

#[derive(Clone)]
enum WaitMode {
    Ready,
    Condition(Predicate),
    ConditionFrom(Predicate, String),
}

impl WaitMode {
    fn name(&self) -> &'static str {
        match self {
            WaitMode::Ready => "ready",
            WaitMode::Condition(_) | WaitMode::ConditionFrom(..) => "condition",
        }
    }
}

/// Fans a wait out over a batch of resources and joins it against one deadline.
#[derive(Debug, Clone)]
pub struct BatchWaiter {
    registry: HandlerRegistry,
    timeout: Duration,
    backoff: RetryBackoff,
    concurrency: Option<usize>,
}

impl BatchWaiter {
    pub fn new(registry: HandlerRegistry, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            backoff: RetryBackoff::default(),
            concurrency: None,
        }
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Cap the number of resources waited on at the same time
    pub fn with_concurrency(mut self, limit: Option<usize>) -> Self {
        self.concurrency = limit.map(|l| l.max(1));
        self
    }

    pub async fn ready(&self, resources: Vec<DynamicObject>) -> Result<WaitReport> {
        self.run(resources, WaitMode::Ready).await
    }

    pub async fn condition(&self, resources: Vec<DynamicObject>, predicate: Predicate) -> Result<WaitReport> {
        self.run(resources, WaitMode::Condition(predicate)).await
    }

    pub async fn condition_from(
        &self,
        resources: Vec<DynamicObject>,
        predicate: Predicate,
        resource_version: &str,
    ) -> Result<WaitReport> {
        self.run(
            resources,
            WaitMode::ConditionFrom(predicate, resource_version.to_string()),
        )
        .await
    }

    #[instrument(skip_all, fields(mode = mode.name(), count = resources.len(), timeout = ?self.timeout))]
    async fn run(&self, resources: Vec<DynamicObject>, mode: WaitMode) -> Result<WaitReport> {
        if resources.is_empty() {
            return Ok(WaitReport::new(Vec::new(), false, self.timeout));
        }

        // Resolve everything up front so a missing handler fails before any wait starts
        let handlers = resources
            .iter()
            .map(|resource| self.registry.resolve_for(resource))
            .collect::<Result<Vec<_>>>()?;

        let deadline = Instant::now() + self.timeout;
        let limiter = self.concurrency.map(|limit| Arc::new(Semaphore::new(limit)));
        let mut tasks = JoinSet::new();

        for (index, (resource, handler)) in resources.iter().cloned().zip(handlers).enumerate() {
            let mode = mode.clone();
            let backoff = self.backoff;
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                let remaining = deadline.saturating_duration_since(Instant::now());
                let outcome = wait_one(handler, resource, &mode, remaining, &backoff).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<WaitOutcome>> = resources.iter().map(|_| None).collect();
        let mut expired = false;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => slots[index] = Some(outcome),
                Ok(Some(Err(e))) => warn!("Wait task ended abnormally: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!("Deadline of {:?} elapsed, cancelling {} pending wait(s)", self.timeout, tasks.len());
                    tasks.abort_all();
                    expired = true;
                    break;
                }
            }
        }

        let outcomes: Vec<WaitOutcome> = resources
            .into_iter()
            .zip(slots)
            .map(|(resource, slot)| {
                slot.unwrap_or(WaitOutcome::Unmatched {
                    resource,
                    error: None,
                })
            })
            .collect();
        let timed_out = expired || outcomes.iter().any(WaitOutcome::is_timeout);

        Ok(WaitReport::new(outcomes, timed_out, self.timeout))
    }
}

async fn wait_one(
    handler: Arc<dyn ResourceHandler>,
    resource: DynamicObject,
    mode: &WaitMode,
    remaining: Duration,
    backoff: &RetryBackoff,
) -> WaitOutcome {
    let namespace = resource.namespace();
    let namespace = namespace.as_deref();
    let result = match mode {
        WaitMode::Ready => {
            handler
                .wait_until_ready(namespace, &resource, remaining, backoff)
                .await
        }
        WaitMode::Condition(predicate) => {
            handler
                .wait_until_condition(namespace, &resource, predicate, remaining, backoff)
                .await
        }
        WaitMode::ConditionFrom(predicate, resource_version) => {
            handler
                .wait_until_condition_from(namespace, &resource, predicate, resource_version, remaining, backoff)
                .await
        }
    };

    match result {
        Ok(current) => WaitOutcome::Matched(current),
        Err(LifecycleError::NotSupported(reason)) if matches!(mode, WaitMode::Ready) => {
            info!("Skipping readiness wait for {}: {}", describe(&resource), reason);
            WaitOutcome::Skipped(resource)
        }
        Err(e) => {
            warn!(
                kind = kind_of(&resource),
                name = %resource.name_any(),
                namespace = ?resource.namespace(),
                "Resource did not reach the expected state: {}",
                e
            );
            debug!("Wait failure for {}: {:?}", describe(&resource), e);
            WaitOutcome::Unmatched {
                resource,
                error: Some(e),
            }
        }
    }
}
