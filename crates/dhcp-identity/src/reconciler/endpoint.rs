//! Endpoint upsert

use super::{Reconcile, ReconcileOutcome};
use crate::error::ReconcileError;
use crate::mac;
use crate::resolver::Binding;
use crds::{Endpoint, EndpointSpec, LABEL_MAC};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use mac_address::MacAddress;
use object_store::ObjectStore;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Creates or updates the Endpoint of a resolved machine
pub struct EndpointReconciler {
    store: Arc<dyn ObjectStore<Endpoint>>,
}

impl fmt::Debug for EndpointReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointReconciler").finish_non_exhaustive()
    }
}

impl EndpointReconciler {
    /// Create a reconciler writing Endpoints through `store`
    pub fn new(store: Arc<dyn ObjectStore<Endpoint>>) -> Self {
        Self { store }
    }

    /// Upsert the Endpoint named `identity`
    ///
    /// Created if absent, updated in place if its MAC or IP differ, left
    /// untouched otherwise. Endpoints are never deleted here.
    pub async fn upsert(
        &self,
        identity: &str,
        mac: &MacAddress,
        address: &IpAddr,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let desired = EndpointSpec {
            mac_address: mac::canonical(mac),
            ip: address.to_string(),
        };

        match self.store.get(identity).await {
            Ok(existing) => {
                if !existing.spec.differs_from(&desired) {
                    debug!("Endpoint {} already up-to-date", identity);
                    return Ok(ReconcileOutcome::Unchanged);
                }
                info!(
                    "Endpoint {} changed ({} {} -> {} {}), updating",
                    identity, existing.spec.mac_address, existing.spec.ip, desired.mac_address, desired.ip
                );
                let mut updated = existing;
                updated
                    .metadata
                    .labels
                    .get_or_insert_with(BTreeMap::new)
                    .insert(LABEL_MAC.to_string(), mac::sanitized(mac));
                updated.spec = desired;
                self.store.replace(&updated).await.map_err(|e| {
                    error!("Failed to update Endpoint {}: {}", identity, e);
                    ReconcileError::store(format!("Failed to update Endpoint {}", identity), e)
                })?;
                Ok(ReconcileOutcome::Updated)
            }
            Err(e) if e.is_not_found() => {
                let endpoint = Endpoint {
                    metadata: ObjectMeta {
                        name: Some(identity.to_string()),
                        labels: Some(BTreeMap::from([(LABEL_MAC.to_string(), mac::sanitized(mac))])),
                        ..Default::default()
                    },
                    spec: desired,
                };
                match self.store.create(&endpoint).await {
                    Ok(_) => {
                        info!("Created Endpoint {} ({} -> {})", identity, mac::canonical(mac), address);
                        Ok(ReconcileOutcome::Created)
                    }
                    Err(e) if e.is_conflict() => {
                        info!("Endpoint {} was created concurrently, skipping", identity);
                        Ok(ReconcileOutcome::Conflict)
                    }
                    Err(e) => {
                        error!("Failed to create Endpoint {}: {}", identity, e);
                        Err(ReconcileError::store(format!("Failed to create Endpoint {}", identity), e))
                    }
                }
            }
            Err(e) => {
                error!("Failed to get Endpoint {}: {}", identity, e);
                Err(ReconcileError::store(format!("Failed to get Endpoint {}", identity), e))
            }
        }
    }
}

#[async_trait::async_trait]
impl Reconcile for EndpointReconciler {
    fn name(&self) -> &'static str {
        "endpoint"
    }

    async fn reconcile(&self, binding: &Binding) -> Result<ReconcileOutcome, ReconcileError> {
        self.upsert(&binding.identity, &binding.mac, &binding.address).await
    }
}
