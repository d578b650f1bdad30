// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::backoff::{INITIAL_MILLIS, MAX_INTERVAL_SECS, MULTIPLIER};
use crate::handlers::DeleteOptions;
use crate::pipeline::{MutationPipeline, Visitor};
use kube::api::PropagationPolicy;
use std::time::Duration;

/// Exponential backoff between retries of a wait (reconnects, polls)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryBackoff {
    pub initial: Duration,
    pub multiplier: f64,
}

impl RetryBackoff {
    pub fn new(initial: Duration, multiplier: f64) -> Self {
        Self { initial, multiplier }
    }

    /// Delay following `current`, never shrinking and capped at MAX_INTERVAL_SECS
    pub fn next(&self, current: Duration) -> Duration {
        let max = Duration::from_secs(MAX_INTERVAL_SECS);
        let multiplier = if self.multiplier.is_nan() { 1.0 } else { self.multiplier.max(1.0) };
        let secs = (current.as_secs_f64() * multiplier).min(max.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(max).max(current.min(max))
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(INITIAL_MILLIS), MULTIPLIER)
    }
}

/// Immutable settings shared by every verb of an operation.
///
/// Each `with`-style method returns a new value; the receiver is left untouched,
/// so a config can be shared between concurrent callers.
#[derive(Debug, Clone)]
pub struct OperationConfig {
    pub fallback_namespace: Option<String>,
    pub explicit_namespace: Option<String>,
    pub from_server: bool,
    pub deleting_existing: bool,
    pub cascading: bool,
    pub grace_period_seconds: Option<u32>,
    pub propagation_policy: Option<PropagationPolicy>,
    pub backoff: RetryBackoff,
    pub visitors: Vec<Visitor>,
    /// Upper bound on concurrent per-resource waits, unbounded when `None`
    pub wait_concurrency: Option<usize>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            fallback_namespace: None,
            explicit_namespace: None,
            from_server: false,
            deleting_existing: false,
            cascading: true,
            grace_period_seconds: None,
            propagation_policy: None,
            backoff: RetryBackoff::default(),
            visitors: Vec::new(),
            wait_concurrency: None,
        }
    }
}

impl OperationConfig {
    pub fn new(fallback_namespace: &str) -> Self {
        Self::default().with_fallback_namespace(fallback_namespace)
    }

    pub fn with_fallback_namespace(&self, namespace: &str) -> Self {
        Self {
            fallback_namespace: Some(namespace.to_string()),
            ..self.clone()
        }
    }

    pub fn in_namespace(&self, namespace: &str) -> Self {
        Self {
            explicit_namespace: Some(namespace.to_string()),
            ..self.clone()
        }
    }

    pub fn from_server(&self) -> Self {
        Self {
            from_server: true,
            ..self.clone()
        }
    }

    pub fn deleting_existing(&self) -> Self {
        Self {
            deleting_existing: true,
            ..self.clone()
        }
    }

    pub fn cascading(&self, cascading: bool) -> Self {
        Self {
            cascading,
            ..self.clone()
        }
    }

    pub fn with_grace_period(&self, seconds: u32) -> Self {
        Self {
            grace_period_seconds: Some(seconds),
            ..self.clone()
        }
    }

    pub fn with_propagation_policy(&self, policy: PropagationPolicy) -> Self {
        Self {
            propagation_policy: Some(policy),
            ..self.clone()
        }
    }

    pub fn with_wait_retry_backoff(&self, initial: Duration, multiplier: f64) -> Self {
        Self {
            backoff: RetryBackoff::new(initial, multiplier),
            ..self.clone()
        }
    }

    pub fn with_wait_concurrency(&self, limit: usize) -> Self {
        Self {
            wait_concurrency: Some(limit.max(1)),
            ..self.clone()
        }
    }

    pub fn accept(&self, visitor: Visitor) -> Self {
        let mut visitors = self.visitors.clone();
        visitors.push(visitor);
        Self {
            visitors,
            ..self.clone()
        }
    }

    /// Caller visitors with namespace resolution appended last
    pub fn pipeline(&self) -> MutationPipeline {
        MutationPipeline::new(
            &self.visitors,
            self.explicit_namespace.as_deref(),
            self.fallback_namespace.as_deref(),
        )
    }

    /// Explicit policy wins; otherwise cascading deletes run in the background
    /// and non-cascading deletes orphan dependents
    pub fn delete_options(&self) -> DeleteOptions {
        let propagation_policy = match &self.propagation_policy {
            Some(policy) => policy.clone(),
            None if self.cascading => PropagationPolicy::Background,
            None => PropagationPolicy::Orphan,
        };
        DeleteOptions {
            propagation_policy: Some(propagation_policy),
            grace_period_seconds: self.grace_period_seconds,
        }
    }
}
