// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::{describe, describe_all, ResourceKey};
use kube::core::DynamicObject;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("No handler registered for {0}")]
    HandlerNotFound(ResourceKey),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Failed to parse manifest: {0}")]
    ManifestError(String),

    #[error("Failed to delete existing item: {0}")]
    DeleteFailed(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Wait interrupted: {0}")]
    Interrupted(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(
        "Timed out after {:?} waiting for {} resource(s): [{}]",
        .timeout,
        .unmatched.len(),
        describe_all(.unmatched)
    )]
    WaitTimeout {
        unmatched: Vec<DynamicObject>,
        timeout: Duration,
    },

    #[error("Batch aborted after applying {} resource(s): {}", .applied.len(), .source)]
    BatchAborted {
        applied: Vec<DynamicObject>,
        #[source]
        source: Box<LifecycleError>,
    },

    #[error("Kubeconfig error: {0}")]
    KubeconfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LifecycleError {
    /// True when the remote store rejected the request with a conflict status (409).
    pub fn is_conflict(&self) -> bool {
        match self {
            LifecycleError::KubeError(kube::Error::Api(response)) => response.code == 409,
            LifecycleError::BatchAborted { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    pub fn timed_out(unmatched: Vec<DynamicObject>, timeout: Duration) -> Self {
        LifecycleError::WaitTimeout { unmatched, timeout }
    }

    pub fn not_supported(what: &str, resource: &DynamicObject) -> Self {
        LifecycleError::NotSupported(format!("{} for {}", what, describe(resource)))
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
