// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kind-keyed lookup of resource handlers.

use crate::error::{LifecycleError, Result};
use crate::handlers::{ListHandler, ResourceHandler};
use crate::types::ResourceKey;
use kube::core::DynamicObject;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps a (kind, apiVersion) pair to the handler implementing its remote operations.
///
/// Registration is explicit. Container kinds without an explicit registration
/// resolve to a [`ListHandler`] over this registry. Cloning is cheap.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<HashMap<ResourceKey, Arc<dyn ResourceHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: &str, api_version: &str, handler: Arc<dyn ResourceHandler>) -> Self {
        self.insert(ResourceKey::new(kind, api_version), handler);
        self
    }

    pub fn insert(&mut self, key: ResourceKey, handler: Arc<dyn ResourceHandler>) {
        Arc::make_mut(&mut self.handlers).insert(key, handler);
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn resolve(&self, kind: &str, api_version: &str) -> Result<Arc<dyn ResourceHandler>> {
        self.resolve_key(&ResourceKey::new(kind, api_version))
    }

    pub fn resolve_key(&self, key: &ResourceKey) -> Result<Arc<dyn ResourceHandler>> {
        if let Some(handler) = self.handlers.get(key) {
            return Ok(handler.clone());
        }
        if key.is_list() {
            return Ok(Arc::new(ListHandler::new(self.clone())));
        }
        Err(LifecycleError::HandlerNotFound(key.clone()))
    }

    pub fn resolve_for(&self, resource: &DynamicObject) -> Result<Arc<dyn ResourceHandler>> {
        self.resolve_key(&ResourceKey::of(resource)?)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.handlers.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("HandlerRegistry").field("handlers", &keys).finish()
    }
}
