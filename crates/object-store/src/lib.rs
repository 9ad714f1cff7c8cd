//! Object Store Client
//!
//! A small, typed abstraction over the Kubernetes API used as a transactional
//! object store for DHCP endpoint and reservation records.
//!
//! # Example
//!
//! ```no_run
//! use object_store::{KubeStore, ObjectStore};
//! use crds::Endpoint;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store: KubeStore<Endpoint> = KubeStore::namespaced(client, "default", Duration::from_secs(10));
//!
//! // Get an object by name; a missing object is a distinguishable error
//! match store.get("compute-1").await {
//!     Ok(endpoint) => println!("{:?}", endpoint.spec),
//!     Err(e) if e.is_not_found() => println!("not created yet"),
//!     Err(e) => return Err(e.into()),
//! }
//!
//! // List objects by label selector
//! let endpoints = store.list(&[("mac", "aabbccddeeff")]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed access**: one store per resource kind
//! - **Error classification**: not-found and already-exists are separate from other failures
//! - **Timeouts**: every call is bounded by the configured timeout
//! - **Mocking**: in-memory `MockObjectStore` behind the `test-util` feature

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeStore;
pub use error::StoreError;
pub use store_trait::{ObjectStore, StoreObject};
#[cfg(feature = "test-util")]
pub use mock::{MockObjectStore, MockOp};
