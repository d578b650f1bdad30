// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-or-replace, delete and reload primitives shared by single and batch operations.

use crate::error::{LifecycleError, Result};
use crate::handlers::{DeleteOptions, ResourceHandler};
use crate::pipeline::MutationPipeline;
use crate::registry::HandlerRegistry;
use crate::types::{describe, list_items, with_items};
use kube::core::DynamicObject;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A resource after the mutation pipeline, paired with the handler that owns it
pub type Prepared = (Arc<dyn ResourceHandler>, DynamicObject);

/// Resolve every handler, then run the pipeline over every resource.
/// Nothing remote happens here, so an unknown kind fails before any request is sent.
pub fn prepare(
    registry: &HandlerRegistry,
    pipeline: &MutationPipeline,
    resources: &[DynamicObject],
) -> Result<Vec<Prepared>> {
    let handlers = resources
        .iter()
        .map(|resource| registry.resolve_for(resource))
        .collect::<Result<Vec<_>>>()?;
    handlers
        .into_iter()
        .zip(resources)
        .map(|(handler, resource)| {
            let edited = pipeline.apply(handler.as_ref(), resource)?;
            Ok((handler, edited))
        })
        .collect()
}

/// Create the resource, resolving a conflict by replacing it, or by deleting and
/// recreating it when `deleting_existing` is set.
///
/// The create attempt never carries a resourceVersion; the caller's version is
/// restored for the replace.
#[instrument(skip(handler, options, resource), fields(resource = %describe(resource)))]
pub async fn create_or_replace(
    handler: &dyn ResourceHandler,
    options: &DeleteOptions,
    deleting_existing: bool,
    resource: &DynamicObject,
) -> Result<DynamicObject> {
    let namespace = resource.namespace();
    let namespace = namespace.as_deref();
    let mut candidate = resource.clone();
    candidate.metadata.resource_version = None;

    let err = match handler.create(namespace, &candidate).await {
        Ok(created) => {
            debug!("Created {}", describe(&created));
            return Ok(created);
        }
        Err(e) if e.is_conflict() => e,
        Err(e) => return Err(e),
    };

    if deleting_existing {
        info!("{} already exists, deleting it before recreating: {}", describe(resource), err);
        if !handler.delete(namespace, options, &candidate).await? {
            return Err(LifecycleError::DeleteFailed(describe(resource)));
        }
        handler.create(namespace, &candidate).await
    } else {
        debug!("{} already exists, replacing it", describe(resource));
        candidate.metadata.resource_version = resource.metadata.resource_version.clone();
        handler.replace(namespace, &candidate).await
    }
}

/// Create-or-replace a container one member at a time. Each member gets its own
/// versionless create attempt and its own conflict resolution.
pub async fn create_or_replace_members(
    registry: &HandlerRegistry,
    options: &DeleteOptions,
    deleting_existing: bool,
    list: &DynamicObject,
) -> Result<DynamicObject> {
    let members = list_items(list)
        .unwrap_or_else(|| Err(LifecycleError::InvalidResource(format!("{} has no items", describe(list)))))?;
    let handlers = members
        .iter()
        .map(|member| registry.resolve_for(member))
        .collect::<Result<Vec<_>>>()?;
    let mut applied = Vec::with_capacity(members.len());
    for (handler, member) in handlers.iter().zip(&members) {
        applied.push(create_or_replace(handler.as_ref(), options, deleting_existing, member).await?);
    }
    with_items(list, &applied)
}

/// Create-or-replace each prepared resource in order. The first fatal error stops
/// the batch and is returned together with everything applied before it.
pub async fn create_or_replace_all(
    targets: &[Prepared],
    options: &DeleteOptions,
    deleting_existing: bool,
) -> Result<Vec<DynamicObject>> {
    let mut applied = Vec::with_capacity(targets.len());
    for (handler, resource) in targets {
        match create_or_replace(handler.as_ref(), options, deleting_existing, resource).await {
            Ok(result) => applied.push(result),
            Err(source) => {
                warn!(
                    "Aborting batch at {} after {} applied resource(s)",
                    describe(resource),
                    applied.len()
                );
                return Err(LifecycleError::BatchAborted {
                    applied,
                    source: Box::new(source),
                });
            }
        }
    }
    Ok(applied)
}

/// Delete a batch. Every resource must resolve to a handler before the first
/// delete is issued; an unresolvable resource makes the whole call return false.
#[instrument(skip_all, fields(count = resources.len()))]
pub async fn delete_all(
    registry: &HandlerRegistry,
    pipeline: &MutationPipeline,
    options: &DeleteOptions,
    resources: &[DynamicObject],
) -> Result<bool> {
    let mut handlers = Vec::with_capacity(resources.len());
    for resource in resources {
        match registry.resolve_for(resource) {
            Ok(handler) => handlers.push(handler),
            Err(e) => {
                warn!("Not deleting anything, {} cannot be handled: {}", describe(resource), e);
                return Ok(false);
            }
        }
    }

    for (handler, resource) in handlers.iter().zip(resources) {
        if !delete(handler.as_ref(), pipeline, options, resource).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub async fn delete(
    handler: &dyn ResourceHandler,
    pipeline: &MutationPipeline,
    options: &DeleteOptions,
    resource: &DynamicObject,
) -> Result<bool> {
    let target = pipeline.apply(handler, resource)?;
    let deleted = handler
        .delete(target.namespace().as_deref(), options, &target)
        .await?;
    if !deleted {
        debug!("Nothing deleted for {}", describe(&target));
    }
    Ok(deleted)
}

/// Current remote state with the pipeline re-applied on top, `None` when absent
pub async fn reload(
    handler: &dyn ResourceHandler,
    pipeline: &MutationPipeline,
    resource: &DynamicObject,
) -> Result<Option<DynamicObject>> {
    match handler
        .reload(resource.namespace().as_deref(), resource)
        .await?
    {
        Some(current) => pipeline.apply(handler, &current).map(Some),
        None => Ok(None),
    }
}
