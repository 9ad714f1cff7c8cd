//! Object store errors

use thiserror::Error;

/// Errors that can occur when interacting with the object store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object with the same name already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Replace was based on a stale resource version
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Call did not complete within the configured timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Kubernetes client or API error
    #[error("Kubernetes error: {0}")]
    Kube(kube::Error),

    /// Store rejected the request for another reason
    #[error("Store API error: {0}")]
    Api(String),
}

impl StoreError {
    /// Whether the error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether the error means the object already exists
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    /// Whether a replace lost against a concurrent write
    pub fn is_stale(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        if let kube::Error::Api(resp) = &err {
            match resp.code {
                404 => return StoreError::NotFound(resp.message.clone()),
                409 => return StoreError::AlreadyExists(resp.message.clone()),
                _ => {}
            }
        }
        StoreError::Kube(err)
    }
}
