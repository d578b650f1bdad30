// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::LIST_KIND;
use crate::error::{LifecycleError, Result};
use kube::core::DynamicObject;
use kube::ResourceExt;
use std::fmt;

/// Dispatch key of a resource: its kind and apiVersion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub kind: String,
    pub api_version: String,
}

impl ResourceKey {
    pub fn new(kind: &str, api_version: &str) -> Self {
        Self {
            kind: kind.to_string(),
            api_version: api_version.to_string(),
        }
    }

    /// Read the key from the type information carried by the resource
    pub fn of(resource: &DynamicObject) -> Result<Self> {
        match resource.types.as_ref() {
            Some(types) if !types.kind.is_empty() && !types.api_version.is_empty() => {
                Ok(Self::new(&types.kind, &types.api_version))
            }
            _ => Err(LifecycleError::InvalidResource(format!(
                "{} has no apiVersion/kind",
                resource.name_any()
            ))),
        }
    }

    /// Container kinds (`List`, `PodList`, ...) hold their members under `items`
    pub fn is_list(&self) -> bool {
        is_list_kind(&self.kind)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.api_version)
    }
}

pub fn is_list_kind(kind: &str) -> bool {
    kind == LIST_KIND || kind.ends_with(LIST_KIND)
}

pub fn kind_of(resource: &DynamicObject) -> &str {
    resource
        .types
        .as_ref()
        .map(|t| t.kind.as_str())
        .unwrap_or("Unknown")
}

/// Human readable identity used in logs and error messages: `Kind ns/name`
pub fn describe(resource: &DynamicObject) -> String {
    match resource.namespace() {
        Some(ns) if !ns.is_empty() => format!("{} {}/{}", kind_of(resource), ns, resource.name_any()),
        _ => format!("{} {}", kind_of(resource), resource.name_any()),
    }
}

pub fn describe_all(resources: &[DynamicObject]) -> String {
    resources.iter().map(describe).collect::<Vec<_>>().join(", ")
}

/// Members of a container resource, or `None` when the resource is not a container
pub fn list_items(resource: &DynamicObject) -> Option<Result<Vec<DynamicObject>>> {
    if !resource.types.as_ref().is_some_and(|t| is_list_kind(&t.kind)) {
        return None;
    }
    let items = resource.data.get("items")?.as_array()?;
    Some(
        items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(LifecycleError::from))
            .collect(),
    )
}

/// Copy of `list` carrying `items` as its members
pub fn with_items(list: &DynamicObject, items: &[DynamicObject]) -> Result<DynamicObject> {
    let mut result = list.clone();
    let items = serde_json::to_value(items)?;
    match result.data.as_object_mut() {
        Some(map) => {
            map.insert("items".to_string(), items);
        }
        None => result.data = serde_json::json!({ "items": items }),
    }
    Ok(result)
}

/// Expand container resources into their members, keeping order
pub fn flatten(resources: Vec<DynamicObject>) -> Result<Vec<DynamicObject>> {
    let mut result = Vec::with_capacity(resources.len());
    for resource in resources {
        match list_items(&resource) {
            Some(items) => result.extend(flatten(items?)?),
            None => result.push(resource),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_list, make_resource};

    #[test]
    fn test_key_of_resource() {
        let resource = make_resource("ConfigMap", "cfg", None);
        let key = ResourceKey::of(&resource).unwrap();
        assert_eq!(key, ResourceKey::new("ConfigMap", "v1"));
        assert!(!key.is_list());
    }

    #[test]
    fn test_key_of_resource_without_types() {
        let mut resource = make_resource("ConfigMap", "cfg", None);
        resource.types = None;
        let err = ResourceKey::of(&resource).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidResource(_)));
    }

    #[test]
    fn test_list_kinds() {
        assert!(is_list_kind("List"));
        assert!(is_list_kind("PodList"));
        assert!(!is_list_kind("Pod"));
    }

    #[test]
    fn test_describe_with_and_without_namespace() {
        assert_eq!(
            describe(&make_resource("Pod", "web", Some("ns-a"))),
            "Pod ns-a/web"
        );
        assert_eq!(describe(&make_resource("Namespace", "ns-a", None)), "Namespace ns-a");
    }

    #[test]
    fn test_list_items_of_non_list() {
        assert!(list_items(&make_resource("Pod", "web", None)).is_none());
    }

    #[test]
    fn test_flatten_expands_nested_lists_in_order() {
        let inner = make_list(vec![
            make_resource("Pod", "b", None),
            make_resource("Pod", "c", None),
        ]);
        let outer = make_list(vec![make_resource("Pod", "a", None), inner]);
        let flat = flatten(vec![outer, make_resource("Pod", "d", None)]).unwrap();

        let names: Vec<_> = flat.iter().map(|r| r.name_any()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_with_items_replaces_members() {
        let list = make_list(vec![make_resource("Pod", "a", None)]);
        let replaced = with_items(&list, &[make_resource("Pod", "z", None)]).unwrap();
        let items = list_items(&replaced).unwrap().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name_any(), "z");
    }
}
