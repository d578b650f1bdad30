// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Handler registration from API discovery

use crate::error::Result;
use crate::kubernetes::DynamicHandler;
use crate::registry::HandlerRegistry;
use crate::types::ResourceKey;
use kube::discovery::{Discovery, Scope};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, info, instrument};

impl HandlerRegistry {
    /// Register a [`DynamicHandler`] for the recommended version of every
    /// resource type the API server serves.
    #[instrument(skip(client))]
    pub async fn discover(client: &Client) -> Result<Self> {
        let discovery = Discovery::new(client.clone()).run().await?;
        let mut registry = HandlerRegistry::new();

        for group in discovery.groups() {
            for (resource, capabilities) in group.recommended_resources() {
                let key = ResourceKey::new(&resource.kind, &resource.api_version);
                debug!("Registering handler for {}", key);
                let namespaced = capabilities.scope == Scope::Namespaced;
                registry.insert(key, Arc::new(DynamicHandler::new(client.clone(), resource, namespaced)));
            }
        }

        info!("Discovered {} resource types", registry.len());
        Ok(registry)
    }
}
