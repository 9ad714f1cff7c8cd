//! Kubernetes-backed object store
//!
//! Implements `ObjectStore` on top of `kube::Api`. Every call is bounded by a
//! timeout; an expired call is reported as `StoreError::Timeout` and has no
//! effect the caller can rely on.

use crate::error::StoreError;
use crate::store_trait::{ObjectStore, StoreObject};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Object store for one resource kind, backed by the Kubernetes API
pub struct KubeStore<K> {
    api: Api<K>,
    timeout: Duration,
}

impl<K> std::fmt::Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<K: StoreObject> KubeStore<K> {
    /// Create a store from an existing API handle
    pub fn new(api: Api<K>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// Create a store for a namespaced resource kind
    ///
    /// # Arguments
    /// * `client` - Kubernetes client
    /// * `namespace` - Namespace all objects live in
    /// * `timeout` - Upper bound for every API call
    pub fn namespaced(client: Client, namespace: &str, timeout: Duration) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Self::new(Api::namespaced(client, namespace), timeout)
    }

    async fn bounded<T, F>(&self, op: &str, name: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, kube::Error>> + Send,
    {
        debug!("{} {} {}", op, K::kind(&()), name);
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(elapsed) => Err(StoreError::Timeout(format!(
                "{} {} {} after {:?} ({})",
                op,
                K::kind(&()),
                name,
                self.timeout,
                elapsed
            ))),
        }
    }
}

/// Render label pairs as a Kubernetes equality-based selector
pub fn label_selector(labels: &[(&str, &str)]) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// A 409 on replace means the resource version was stale, not that the
/// object already exists
fn stale_on_conflict(err: StoreError) -> StoreError {
    match err {
        StoreError::AlreadyExists(msg) => StoreError::Conflict(msg),
        other => other,
    }
}

#[async_trait::async_trait]
impl<K: StoreObject> ObjectStore<K> for KubeStore<K> {
    async fn get(&self, name: &str) -> Result<K, StoreError> {
        self.bounded("get", name, self.api.get(name)).await
    }

    async fn list(&self, labels: &[(&str, &str)]) -> Result<Vec<K>, StoreError> {
        let selector = label_selector(labels);
        let lp = ListParams::default().labels(&selector);
        let list = self.bounded("list", &selector, self.api.list(&lp)).await?;
        Ok(list.items)
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let pp = PostParams::default();
        self.bounded("create", &name, self.api.create(&pp, object)).await
    }

    async fn replace(&self, object: &K) -> Result<K, StoreError> {
        let name = object.name_any();
        let pp = PostParams::default();
        self.bounded("replace", &name, self.api.replace(&name, &pp, object))
            .await
            .map_err(stale_on_conflict)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let dp = DeleteParams::default();
        self.bounded("delete", name, self.api.delete(name, &dp)).await?;
        Ok(())
    }
}
