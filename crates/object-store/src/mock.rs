//! Mock ObjectStore for unit testing
//!
//! This module provides an in-memory implementation of `ObjectStore` that can be
//! used in unit tests without a running cluster. Failures can be injected per
//! operation to exercise error paths.

use crate::error::StoreError;
use crate::store_trait::{ObjectStore, StoreObject};
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Store operation, used for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// `ObjectStore::get`
    Get,
    /// `ObjectStore::list`
    List,
    /// `ObjectStore::create`
    Create,
    /// `ObjectStore::replace`
    Replace,
    /// `ObjectStore::delete`
    Delete,
}

/// Mock object store for testing
///
/// Objects are kept in name order, so `list` returns them sorted by name.
/// Clones share the same storage.
#[derive(Debug)]
pub struct MockObjectStore<K> {
    objects: Arc<Mutex<BTreeMap<String, K>>>,
    failures: Arc<Mutex<HashMap<MockOp, StoreError>>>,
    calls: Arc<Mutex<HashMap<MockOp, usize>>>,
    next_version: Arc<Mutex<u64>>,
}

impl<K> Clone for MockObjectStore<K> {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
            failures: Arc::clone(&self.failures),
            calls: Arc::clone(&self.calls),
            next_version: Arc::clone(&self.next_version),
        }
    }
}

impl<K: StoreObject> Default for MockObjectStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: StoreObject> MockObjectStore<K> {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
            next_version: Arc::new(Mutex::new(1)),
        }
    }

    /// Add an object to the mock store (for test setup)
    pub fn insert(&self, object: K) {
        let mut object = object;
        object.meta_mut().resource_version = Some(self.next_version().to_string());
        self.objects.lock().unwrap().insert(object.name_any(), object);
    }

    /// Fetch an object without counting a call (for test assertions)
    pub fn peek(&self, name: &str) -> Option<K> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    /// All objects currently stored, in name order
    pub fn all(&self) -> Vec<K> {
        self.objects.lock().unwrap().values().cloned().collect()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: MockOp, error: StoreError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    /// Number of times `op` has been called
    pub fn calls(&self, op: MockOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    fn next_version(&self) -> u64 {
        let mut version = self.next_version.lock().unwrap();
        let current = *version;
        *version += 1;
        current
    }

    fn enter(&self, op: MockOp) -> Result<(), StoreError> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        match self.failures.lock().unwrap().remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl<K: StoreObject> ObjectStore<K> for MockObjectStore<K> {
    async fn get(&self, name: &str) -> Result<K, StoreError> {
        self.enter(MockOp::Get)?;
        self.peek(name)
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", K::kind(&()), name)))
    }

    async fn list(&self, labels: &[(&str, &str)]) -> Result<Vec<K>, StoreError> {
        self.enter(MockOp::List)?;
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .values()
            .filter(|object| {
                let object_labels = object.labels();
                labels
                    .iter()
                    .all(|(k, v)| object_labels.get(*k).is_some_and(|value| value.as_str() == *v))
            })
            .cloned()
            .collect())
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        self.enter(MockOp::Create)?;
        let name = object.name_any();
        if self.objects.lock().unwrap().contains_key(&name) {
            return Err(StoreError::AlreadyExists(format!(
                "{} {} already exists",
                K::kind(&()),
                name
            )));
        }
        let mut created = object.clone();
        created.meta_mut().resource_version = Some(self.next_version().to_string());
        self.objects.lock().unwrap().insert(name, created.clone());
        Ok(created)
    }

    async fn replace(&self, object: &K) -> Result<K, StoreError> {
        self.enter(MockOp::Replace)?;
        let name = object.name_any();
        let mut objects = self.objects.lock().unwrap();
        let existing = objects
            .get(&name)
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", K::kind(&()), name)))?;
        if object.resource_version().is_some() && object.resource_version() != existing.resource_version() {
            return Err(StoreError::Conflict(format!(
                "{} {} has been modified, resource version mismatch",
                K::kind(&()),
                name
            )));
        }
        let mut replaced = object.clone();
        drop(objects);
        replaced.meta_mut().resource_version = Some(self.next_version().to_string());
        self.objects.lock().unwrap().insert(name, replaced.clone());
        Ok(replaced)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.enter(MockOp::Delete)?;
        self.objects
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", K::kind(&()), name)))
    }
}
