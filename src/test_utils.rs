// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: resource fixtures, a scriptable in-memory handler, and a
//! mock HTTP service for Kubernetes API responses.

use crate::constants::{LIST_API_VERSION, LIST_KIND};
use crate::error::{LifecycleError, Result as LifecycleResult};
use crate::handlers::{poll_until_condition, DeleteOptions, Predicate, ResourceHandler, WatchOptions, WatchStream};
use crate::operation::RetryBackoff;
use async_trait::async_trait;
use futures::StreamExt;
use http::{Request, Response};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::WatchEvent;
use kube::client::Body;
use kube::core::{DynamicObject, ErrorResponse, TypeMeta};
use kube::{Client, ResourceExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

fn api_version_of(kind: &str) -> &'static str {
    match kind {
        "Deployment" | "ReplicaSet" | "StatefulSet" | "DaemonSet" => "apps/v1",
        _ => "v1",
    }
}

/// A bare resource of the given kind
pub fn make_resource(kind: &str, name: &str, namespace: Option<&str>) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: api_version_of(kind).to_string(),
            kind: kind.to_string(),
        }),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: namespace.map(str::to_string),
            ..Default::default()
        },
        data: serde_json::json!({}),
    }
}

/// A generic `List` holding `items`
pub fn make_list(items: Vec<DynamicObject>) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: LIST_API_VERSION.to_string(),
            kind: LIST_KIND.to_string(),
        }),
        metadata: ObjectMeta::default(),
        data: serde_json::json!({ "items": serde_json::to_value(items).unwrap() }),
    }
}

/// A remote failure with the given HTTP status code
pub fn api_error(code: u16) -> kube::Error {
    let reason = match code {
        404 => "NotFound",
        409 => "AlreadyExists",
        _ => "InternalError",
    };
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("request failed with status {}", code),
        reason: reason.to_string(),
        code,
    })
}

/// A handler call as observed by [`FakeHandler`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create {
        name: String,
        namespace: Option<String>,
        resource_version: Option<String>,
    },
    Replace {
        name: String,
        namespace: Option<String>,
        resource_version: Option<String>,
    },
    Delete {
        name: String,
        namespace: Option<String>,
        options: DeleteOptions,
    },
    Reload {
        name: String,
        namespace: Option<String>,
    },
}

impl Call {
    pub fn create(name: &str, namespace: Option<&str>, resource_version: Option<&str>) -> Self {
        Call::Create {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            resource_version: resource_version.map(str::to_string),
        }
    }

    pub fn replace(name: &str, namespace: Option<&str>, resource_version: Option<&str>) -> Self {
        Call::Replace {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            resource_version: resource_version.map(str::to_string),
        }
    }

    pub fn delete(name: &str, namespace: Option<&str>, options: DeleteOptions) -> Self {
        Call::Delete {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            options,
        }
    }

    pub fn reload(name: &str, namespace: Option<&str>) -> Self {
        Call::Reload {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }
}

/// In-memory handler keyed by resource name.
///
/// Creating a name that is already stored conflicts. Readiness waits succeed
/// immediately unless scripted otherwise.
pub struct FakeHandler {
    calls: Mutex<Vec<Call>>,
    store: Mutex<HashMap<String, DynamicObject>>,
    delete_result: bool,
    create_error: Option<u16>,
    readiness: bool,
    honor_timeout: bool,
    never_ready: HashSet<String>,
    failing: HashSet<String>,
    interrupting: HashSet<String>,
    delays: HashMap<String, Duration>,
    active_waits: AtomicUsize,
}

impl FakeHandler {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            store: Mutex::new(HashMap::new()),
            delete_result: true,
            create_error: None,
            readiness: true,
            honor_timeout: true,
            never_ready: HashSet::new(),
            failing: HashSet::new(),
            interrupting: HashSet::new(),
            delays: HashMap::new(),
            active_waits: AtomicUsize::new(0),
        }
    }

    pub fn delete_returns(mut self, result: bool) -> Self {
        self.delete_result = result;
        self
    }

    /// Every create fails with this status code
    pub fn create_fails_with(mut self, code: u16) -> Self {
        self.create_error = Some(code);
        self
    }

    /// The kind has no readiness concept
    pub fn without_readiness(mut self) -> Self {
        self.readiness = false;
        self
    }

    pub fn never_ready(mut self, name: &str) -> Self {
        self.never_ready.insert(name.to_string());
        self
    }

    /// Stuck waits block forever instead of giving up at their timeout
    pub fn ignoring_timeout(mut self) -> Self {
        self.honor_timeout = false;
        self
    }

    pub fn ready_after(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn interrupting(mut self, name: &str) -> Self {
        self.interrupting.insert(name.to_string());
        self
    }

    /// Put a resource into the remote store without recording a call
    pub fn store(&self, mut resource: DynamicObject) {
        if resource.metadata.resource_version.is_none() {
            resource.metadata.resource_version = Some("1".to_string());
        }
        self.store.lock().unwrap().insert(resource.name_any(), resource);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Waits currently in progress
    pub fn active_waits(&self) -> usize {
        self.active_waits.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn scripted_failure(&self, resource: &DynamicObject) -> LifecycleResult<()> {
        let name = resource.name_any();
        if self.interrupting.contains(&name) {
            return Err(LifecycleError::Interrupted(name));
        }
        if self.failing.contains(&name) {
            return Err(api_error(500).into());
        }
        Ok(())
    }
}

impl Default for FakeHandler {
    fn default() -> Self {
        Self::new()
    }
}

struct WaitGuard<'a>(&'a AtomicUsize);

impl<'a> WaitGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn in_namespace(resource: &DynamicObject, namespace: Option<&str>) -> DynamicObject {
    let mut resource = resource.clone();
    if let Some(ns) = namespace {
        resource.metadata.namespace = Some(ns.to_string());
    }
    resource
}

#[async_trait]
impl ResourceHandler for FakeHandler {
    async fn create(&self, namespace: Option<&str>, resource: &DynamicObject) -> LifecycleResult<DynamicObject> {
        let name = resource.name_any();
        self.record(Call::create(
            &name,
            namespace,
            resource.metadata.resource_version.as_deref(),
        ));
        if let Some(code) = self.create_error {
            return Err(api_error(code).into());
        }
        let mut store = self.store.lock().unwrap();
        if store.contains_key(&name) {
            return Err(api_error(409).into());
        }
        let mut created = in_namespace(resource, namespace);
        created.metadata.resource_version = Some("1".to_string());
        store.insert(name, created.clone());
        Ok(created)
    }

    async fn replace(&self, namespace: Option<&str>, resource: &DynamicObject) -> LifecycleResult<DynamicObject> {
        let name = resource.name_any();
        self.record(Call::replace(
            &name,
            namespace,
            resource.metadata.resource_version.as_deref(),
        ));
        let mut store = self.store.lock().unwrap();
        let version = store
            .get(&name)
            .and_then(|r| r.metadata.resource_version.as_deref())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let mut replaced = in_namespace(resource, namespace);
        replaced.metadata.resource_version = Some(version.to_string());
        store.insert(name, replaced.clone());
        Ok(replaced)
    }

    async fn delete(
        &self,
        namespace: Option<&str>,
        options: &DeleteOptions,
        resource: &DynamicObject,
    ) -> LifecycleResult<bool> {
        let name = resource.name_any();
        self.record(Call::delete(&name, namespace, options.clone()));
        if !self.delete_result {
            return Ok(false);
        }
        self.store.lock().unwrap().remove(&name);
        Ok(true)
    }

    async fn reload(&self, namespace: Option<&str>, resource: &DynamicObject) -> LifecycleResult<Option<DynamicObject>> {
        let name = resource.name_any();
        self.record(Call::reload(&name, namespace));
        Ok(self.store.lock().unwrap().get(&name).cloned())
    }

    async fn watch(
        &self,
        _namespace: Option<&str>,
        resource: &DynamicObject,
        _options: &WatchOptions,
    ) -> LifecycleResult<WatchStream> {
        let events: Vec<LifecycleResult<WatchEvent<DynamicObject>>> = self
            .store
            .lock()
            .unwrap()
            .get(&resource.name_any())
            .cloned()
            .map(|current| Ok(WatchEvent::Added(current)))
            .into_iter()
            .collect();
        Ok(futures::stream::iter(events).boxed())
    }

    async fn wait_until_ready(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        timeout: Duration,
        _backoff: &RetryBackoff,
    ) -> LifecycleResult<DynamicObject> {
        if !self.readiness {
            return Err(LifecycleError::not_supported("readiness", resource));
        }
        self.scripted_failure(resource)?;
        let _guard = WaitGuard::enter(&self.active_waits);
        let name = resource.name_any();
        if self.never_ready.contains(&name) {
            if !self.honor_timeout {
                return futures::future::pending().await;
            }
            tokio::time::sleep(timeout).await;
            return Err(LifecycleError::timed_out(vec![resource.clone()], timeout));
        }
        if let Some(delay) = self.delays.get(&name) {
            tokio::time::sleep(*delay).await;
        }
        Ok(in_namespace(resource, namespace))
    }

    async fn wait_until_condition(
        &self,
        namespace: Option<&str>,
        resource: &DynamicObject,
        predicate: &Predicate,
        timeout: Duration,
        backoff: &RetryBackoff,
    ) -> LifecycleResult<DynamicObject> {
        self.scripted_failure(resource)?;
        let _guard = WaitGuard::enter(&self.active_waits);
        poll_until_condition(self, namespace, resource, predicate, timeout, backoff).await
    }
}

/// Responses per (method, path), served in order; the last one repeats
type Responses = HashMap<(String, String), Vec<(u16, String)>>;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<Responses>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    uris: Arc<Mutex<Vec<String>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            uris: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push((status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// (method, path) of every request received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Path and query of every request received so far
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();

        // Try exact match first, then a prefix match for paths like /api/v1/namespaces/foo
        let exact = (method.to_string(), path.to_string());
        let key = if responses.contains_key(&exact) {
            exact
        } else {
            responses
                .keys()
                .find(|(m, p)| m == method && path.starts_with(p.as_str()))
                .cloned()?
        };

        let queue = responses.get_mut(&key)?;
        if queue.len() > 1 {
            Some(queue.remove(0))
        } else {
            queue.first().cloned()
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| path.clone());
        self.uris.lock().unwrap().push(uri);

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}
