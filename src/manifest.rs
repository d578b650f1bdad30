// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reading resources from YAML or JSON manifests.

use crate::error::{LifecycleError, Result};
use crate::types::ResourceKey;
use kube::core::DynamicObject;
use serde::Deserialize;

/// Parse a single-document manifest
pub fn parse_manifest(source: &str) -> Result<DynamicObject> {
    let mut resources = parse_manifests(source)?;
    match resources.len() {
        1 => Ok(resources.remove(0)),
        0 => Err(LifecycleError::ManifestError("manifest contains no resource".to_string())),
        n => Err(LifecycleError::ManifestError(format!(
            "expected one resource, found {}",
            n
        ))),
    }
}

/// Parse every document of a `---` separated manifest, skipping empty documents
pub fn parse_manifests(source: &str) -> Result<Vec<DynamicObject>> {
    let mut resources = Vec::new();
    for document in serde_yaml::Deserializer::from_str(source) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| LifecycleError::ManifestError(e.to_string()))?;
        if value.is_null() {
            continue;
        }
        let json = serde_json::to_value(value)?;
        let resource: DynamicObject = serde_json::from_value(json)
            .map_err(|e| LifecycleError::ManifestError(e.to_string()))?;
        ResourceKey::of(&resource)?;
        resources.push(resource);
    }
    Ok(resources)
}
