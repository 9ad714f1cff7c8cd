//! Owned reservation reconciliation
//!
//! Each MAC owns at most one reservation named `<sanitized-mac>-dhcp`. When the
//! desired address or subnet changes the record is deleted and recreated,
//! never updated in place, since the reserved address is immutable once the
//! IPAM backend has acted on it.

use super::{Reconcile, ReconcileOutcome};
use crate::error::ReconcileError;
use crate::mac;
use crate::resolver::Binding;
use crds::{IPReservation, IPReservationSpec, LABEL_IP, LABEL_MAC, LABEL_ORIGIN, SubnetRef, ip_label_value};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use mac_address::MacAddress;
use object_store::ObjectStore;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Value of the `origin` label on reservations created here
pub const ORIGIN: &str = "dhcp";

/// Name of the reservation owned by `mac`
pub fn reservation_name(mac: &MacAddress) -> String {
    format!("{}-{}", mac::sanitized(mac), ORIGIN)
}

/// Keeps the reservation owned by each MAC in line with its desired address
pub struct ReservationReconciler {
    store: Arc<dyn ObjectStore<IPReservation>>,
    subnet: String,
}

impl fmt::Debug for ReservationReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReservationReconciler")
            .field("subnet", &self.subnet)
            .finish_non_exhaustive()
    }
}

impl ReservationReconciler {
    /// Create a reconciler owning reservations in `subnet`
    pub fn new(store: Arc<dyn ObjectStore<IPReservation>>, subnet: impl Into<String>) -> Self {
        Self {
            store,
            subnet: subnet.into(),
        }
    }

    /// Ensure the reservation owned by `mac` holds `address` in `subnet`
    ///
    /// A failed read or delete aborts before anything is created, so the
    /// owned reservation is never duplicated.
    pub async fn reconcile_reservation(
        &self,
        mac: &MacAddress,
        address: &IpAddr,
        subnet: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let name = reservation_name(mac);
        let desired = desired_reservation(&name, mac, address, subnet);

        match self.store.get(&name).await {
            Ok(existing) => {
                if matches_desired(&existing.spec, address, subnet) {
                    debug!("IPReservation {} already up-to-date", name);
                    return Ok(ReconcileOutcome::Unchanged);
                }
                info!(
                    "IPReservation {} changed ({} in {} -> {} in {}), replacing",
                    name, existing.spec.ip, existing.spec.subnet.name, address, subnet
                );
                match self.store.delete(&name).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        debug!("IPReservation {} already deleted", name);
                    }
                    Err(e) => {
                        error!("Failed to delete IPReservation {}: {}", name, e);
                        return Err(ReconcileError::store(format!("Failed to delete IPReservation {}", name), e));
                    }
                }
                self.create(&name, &desired).await.map(|outcome| match outcome {
                    ReconcileOutcome::Created => ReconcileOutcome::Replaced,
                    other => other,
                })
            }
            Err(e) if e.is_not_found() => self.create(&name, &desired).await,
            Err(e) => {
                error!("Failed to get IPReservation {}: {}", name, e);
                Err(ReconcileError::store(format!("Failed to get IPReservation {}", name), e))
            }
        }
    }

    async fn create(&self, name: &str, reservation: &IPReservation) -> Result<ReconcileOutcome, ReconcileError> {
        match self.store.create(reservation).await {
            Ok(_) => {
                info!(
                    "Created IPReservation {} for {} in subnet {}",
                    name, reservation.spec.ip, reservation.spec.subnet.name
                );
                Ok(ReconcileOutcome::Created)
            }
            Err(e) if e.is_conflict() => {
                info!("IPReservation {} was created concurrently, skipping", name);
                Ok(ReconcileOutcome::Conflict)
            }
            Err(e) => {
                error!("Failed to create IPReservation {}: {}", name, e);
                Err(ReconcileError::store(format!("Failed to create IPReservation {}", name), e))
            }
        }
    }
}

fn desired_reservation(name: &str, mac: &MacAddress, address: &IpAddr, subnet: &str) -> IPReservation {
    IPReservation {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([
                (LABEL_IP.to_string(), ip_label_value(address)),
                (LABEL_MAC.to_string(), mac::sanitized(mac)),
                (LABEL_ORIGIN.to_string(), ORIGIN.to_string()),
            ])),
            ..Default::default()
        },
        spec: IPReservationSpec {
            ip: address.to_string(),
            subnet: SubnetRef {
                name: subnet.to_string(),
            },
        },
        status: None,
    }
}

// Addresses are compared parsed so equivalent spellings do not cause churn.
fn matches_desired(existing: &IPReservationSpec, address: &IpAddr, subnet: &str) -> bool {
    let same_ip = existing.ip.parse::<IpAddr>().is_ok_and(|ip| ip == *address);
    same_ip && existing.subnet.name == subnet
}

#[async_trait::async_trait]
impl Reconcile for ReservationReconciler {
    fn name(&self) -> &'static str {
        "reservation"
    }

    async fn reconcile(&self, binding: &Binding) -> Result<ReconcileOutcome, ReconcileError> {
        self.reconcile_reservation(&binding.mac, &binding.address, &self.subnet)
            .await
    }
}
