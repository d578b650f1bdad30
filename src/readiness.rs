// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Built-in readiness predicates for the workload kinds that have one.

use crate::types::{describe, kind_of};
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::{Endpoints, Node, NodeCondition, Pod, PodCondition, ReplicationController};
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use tracing::debug;

const READY_KINDS: &[&str] = &[
    "Deployment",
    "ReplicaSet",
    "ReplicationController",
    "StatefulSet",
    "Pod",
    "Node",
    "Endpoints",
];

pub fn supports_readiness(kind: &str) -> bool {
    READY_KINDS.contains(&kind)
}

/// Whether the observed state is ready. Kinds without a readiness concept are
/// always ready; a payload that cannot be read as its kind is not.
pub fn is_ready(resource: &DynamicObject) -> bool {
    match kind_of(resource) {
        "Deployment" => typed::<Deployment>(resource).is_some_and(|d| deployment_ready(&d)),
        "ReplicaSet" => typed::<ReplicaSet>(resource).is_some_and(|r| replica_set_ready(&r)),
        "ReplicationController" => {
            typed::<ReplicationController>(resource).is_some_and(|r| replication_controller_ready(&r))
        }
        "StatefulSet" => typed::<StatefulSet>(resource).is_some_and(|s| stateful_set_ready(&s)),
        "Pod" => typed::<Pod>(resource).is_some_and(|p| pod_ready(&p)),
        "Node" => typed::<Node>(resource).is_some_and(|n| node_ready(&n)),
        "Endpoints" => typed::<Endpoints>(resource).is_some_and(|e| endpoints_ready(&e)),
        _ => true,
    }
}

fn typed<K: DeserializeOwned>(resource: &DynamicObject) -> Option<K> {
    let value = serde_json::to_value(resource).ok()?;
    match serde_json::from_value(value) {
        Ok(typed) => Some(typed),
        Err(e) => {
            debug!("Cannot read {} for readiness: {}", describe(resource), e);
            None
        }
    }
}

fn deployment_ready(deployment: &Deployment) -> bool {
    let desired = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    deployment.status.as_ref().is_some_and(|status| {
        status.replicas.unwrap_or(0) == desired && status.available_replicas.unwrap_or(0) >= desired
    })
}

fn replica_set_ready(replica_set: &ReplicaSet) -> bool {
    let desired = replica_set.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    replica_set
        .status
        .as_ref()
        .is_some_and(|status| status.ready_replicas.unwrap_or(0) >= desired)
}

fn replication_controller_ready(controller: &ReplicationController) -> bool {
    let desired = controller.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    controller
        .status
        .as_ref()
        .is_some_and(|status| status.ready_replicas.unwrap_or(0) >= desired)
}

fn stateful_set_ready(stateful_set: &StatefulSet) -> bool {
    let desired = stateful_set.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    stateful_set.status.as_ref().is_some_and(|status| {
        status.replicas == desired && status.ready_replicas.unwrap_or(0) >= desired
    })
}

fn pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| conditions.iter().any(is_pod_ready_condition))
}

fn is_pod_ready_condition(condition: &PodCondition) -> bool {
    condition.type_ == "Ready" && condition.status == "True"
}

fn node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| conditions.iter().any(is_node_ready_condition))
}

fn is_node_ready_condition(condition: &NodeCondition) -> bool {
    condition.type_ == "Ready" && condition.status == "True"
}

fn endpoints_ready(endpoints: &Endpoints) -> bool {
    endpoints.subsets.as_ref().is_some_and(|subsets| {
        subsets
            .iter()
            .any(|subset| subset.addresses.as_ref().is_some_and(|a| !a.is_empty()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_object(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    fn make_deployment(desired: i32, replicas: i32, available: i32) -> DynamicObject {
        make_object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "web", "namespace": "ns-a" },
            "spec": {
                "replicas": desired,
                "selector": { "matchLabels": { "app": "web" } },
                "template": { "metadata": { "labels": { "app": "web" } } }
            },
            "status": { "replicas": replicas, "availableReplicas": available }
        }))
    }

    fn make_pod(ready: &str) -> DynamicObject {
        make_object(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "web", "namespace": "ns-a" },
            "status": { "conditions": [{ "type": "Ready", "status": ready }] }
        }))
    }

    #[test]
    fn test_deployment_readiness() {
        assert!(is_ready(&make_deployment(2, 2, 2)));
        assert!(!is_ready(&make_deployment(2, 2, 1)));
        assert!(!is_ready(&make_deployment(2, 3, 3)));
    }

    #[test]
    fn test_deployment_without_status_is_not_ready() {
        let deployment = make_object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "web" },
            "spec": { "selector": {}, "template": {} }
        }));
        assert!(!is_ready(&deployment));
    }

    #[test]
    fn test_pod_readiness_follows_condition() {
        assert!(is_ready(&make_pod("True")));
        assert!(!is_ready(&make_pod("False")));
    }

    #[test]
    fn test_endpoints_need_addresses() {
        let empty = make_object(json!({
            "apiVersion": "v1",
            "kind": "Endpoints",
            "metadata": { "name": "svc" },
            "subsets": [{ "addresses": [] }]
        }));
        let ready = make_object(json!({
            "apiVersion": "v1",
            "kind": "Endpoints",
            "metadata": { "name": "svc" },
            "subsets": [{ "addresses": [{ "ip": "10.0.0.1" }] }]
        }));
        assert!(!is_ready(&empty));
        assert!(is_ready(&ready));
    }

    #[test]
    fn test_kinds_without_readiness_are_ready() {
        let config_map = make_object(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "cfg" }
        }));
        assert!(is_ready(&config_map));
        assert!(!supports_readiness("ConfigMap"));
        assert!(supports_readiness("StatefulSet"));
    }
}
