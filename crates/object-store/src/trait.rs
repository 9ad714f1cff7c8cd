//! ObjectStore trait for mocking
//!
//! This trait abstracts the Kubernetes API to enable mocking in unit tests.
//! `KubeStore` implements it against a live cluster, tests use `MockObjectStore`.

use crate::error::StoreError;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Bounds shared by every resource kind kept in the store
pub trait StoreObject:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> StoreObject for T where
    T: Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Trait for object store operations on a single resource kind
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ObjectStore<K: StoreObject>: Send + Sync {
    /// Get an object by name. Returns `StoreError::NotFound` if absent.
    async fn get(&self, name: &str) -> Result<K, StoreError>;

    /// List objects matching every `(key, value)` label pair
    async fn list(&self, labels: &[(&str, &str)]) -> Result<Vec<K>, StoreError>;

    /// Create an object. Returns `StoreError::AlreadyExists` if the name is taken.
    async fn create(&self, object: &K) -> Result<K, StoreError>;

    /// Replace an existing object in place (name and resource version taken from `object`)
    async fn replace(&self, object: &K) -> Result<K, StoreError>;

    /// Delete an object by name
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}
