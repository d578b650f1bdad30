// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ordered resource transformations applied before any remote action.
//!
//! A resource is opened into a [`ResourceBuilder`] by its handler, every
//! [`Visitor`] edits the staging copy in order, and the builder is finalized
//! into a new resource value. The namespace resolution step is always the last
//! visitor of a [`MutationPipeline`].

use crate::error::Result;
use crate::handlers::ResourceHandler;
use crate::types::with_items;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::DynamicObject;
use std::fmt;
use std::sync::Arc;

/// Mutable staging copy of a resource.
///
/// Container resources carry their members in `items`; visitors are applied to
/// each member instead of the container itself.
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    resource: DynamicObject,
    items: Option<Vec<ResourceBuilder>>,
}

impl ResourceBuilder {
    pub fn new(resource: &DynamicObject) -> Self {
        Self {
            resource: resource.clone(),
            items: None,
        }
    }

    /// Staging copy of a container whose members are edited individually
    pub fn container(resource: &DynamicObject, items: &[DynamicObject]) -> Self {
        Self {
            resource: resource.clone(),
            items: Some(items.iter().map(ResourceBuilder::new).collect()),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.resource.metadata.namespace.as_deref()
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        self.resource.metadata.namespace = Some(namespace.to_string());
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.resource.metadata
    }

    pub fn data_mut(&mut self) -> &mut serde_json::Value {
        &mut self.resource.data
    }

    pub fn accept(&mut self, visitor: &Visitor) {
        match self.items.as_mut() {
            Some(items) => items.iter_mut().for_each(|item| item.accept(visitor)),
            None => visitor.visit(self),
        }
    }

    pub fn build(self) -> Result<DynamicObject> {
        match self.items {
            Some(items) => {
                let items = items
                    .into_iter()
                    .map(ResourceBuilder::build)
                    .collect::<Result<Vec<_>>>()?;
                with_items(&self.resource, &items)
            }
            None => Ok(self.resource),
        }
    }
}

/// A single transformation of a staging resource.
#[derive(Clone)]
pub enum Visitor {
    /// Explicit namespace wins, then the namespace already on the object, then the fallback
    ResolveNamespace {
        explicit: Option<String>,
        fallback: Option<String>,
    },
    Label { key: String, value: String },
    Annotation { key: String, value: String },
    Edit(Arc<dyn Fn(&mut ResourceBuilder) + Send + Sync>),
}

impl Visitor {
    pub fn edit<F>(f: F) -> Self
    where
        F: Fn(&mut ResourceBuilder) + Send + Sync + 'static,
    {
        Visitor::Edit(Arc::new(f))
    }

    pub fn label(key: &str, value: &str) -> Self {
        Visitor::Label {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn annotation(key: &str, value: &str) -> Self {
        Visitor::Annotation {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn resolve_namespace(explicit: Option<&str>, fallback: Option<&str>) -> Self {
        Visitor::ResolveNamespace {
            explicit: non_empty(explicit),
            fallback: non_empty(fallback),
        }
    }

    fn visit(&self, builder: &mut ResourceBuilder) {
        match self {
            Visitor::ResolveNamespace { explicit, fallback } => {
                if let Some(explicit) = explicit {
                    builder.set_namespace(explicit);
                } else if builder.namespace().map_or(true, str::is_empty) {
                    if let Some(fallback) = fallback {
                        builder.set_namespace(fallback);
                    }
                }
            }
            Visitor::Label { key, value } => {
                builder
                    .metadata_mut()
                    .labels
                    .get_or_insert_with(Default::default)
                    .insert(key.clone(), value.clone());
            }
            Visitor::Annotation { key, value } => {
                builder
                    .metadata_mut()
                    .annotations
                    .get_or_insert_with(Default::default)
                    .insert(key.clone(), value.clone());
            }
            Visitor::Edit(f) => f(builder),
        }
    }
}

impl fmt::Debug for Visitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visitor::ResolveNamespace { explicit, fallback } => f
                .debug_struct("ResolveNamespace")
                .field("explicit", explicit)
                .field("fallback", fallback)
                .finish(),
            Visitor::Label { key, value } => write!(f, "Label({}={})", key, value),
            Visitor::Annotation { key, value } => write!(f, "Annotation({}={})", key, value),
            Visitor::Edit(_) => f.write_str("Edit(..)"),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Caller visitors followed by namespace resolution.
#[derive(Debug, Clone)]
pub struct MutationPipeline {
    visitors: Vec<Visitor>,
}

impl MutationPipeline {
    pub fn new(
        visitors: &[Visitor],
        explicit_namespace: Option<&str>,
        fallback_namespace: Option<&str>,
    ) -> Self {
        let mut visitors = visitors.to_vec();
        visitors.push(Visitor::resolve_namespace(explicit_namespace, fallback_namespace));
        Self { visitors }
    }

    pub fn visitors(&self) -> &[Visitor] {
        &self.visitors
    }

    /// Run every visitor over a staging copy obtained from the resource's handler
    pub fn apply(&self, handler: &dyn ResourceHandler, resource: &DynamicObject) -> Result<DynamicObject> {
        let mut builder = handler.edit(resource)?;
        for visitor in &self.visitors {
            builder.accept(visitor);
        }
        builder.build()
    }
}
