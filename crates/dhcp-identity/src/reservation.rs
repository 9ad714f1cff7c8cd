//! Reservation lookup.
//!
//! Finds the address reserved for a MAC address by listing `IPReservation`
//! records labelled with the sanitized MAC and keeping the active ones whose
//! reserved address belongs to the requested family.

use crate::mac;
use crds::{IPReservation, LABEL_MAC};
use kube::ResourceExt;
use mac_address::MacAddress;
use object_store::{ObjectStore, StoreError};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Address family of a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4, looked up for DHCPv4 requests
    V4,
    /// IPv6, looked up for DHCPv6 requests
    V6,
}

impl AddressFamily {
    /// Whether `addr` belongs to this family
    pub fn matches(self, addr: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Looks up reserved addresses in the object store
#[derive(Clone)]
pub struct ReservationLookup {
    store: Arc<dyn ObjectStore<IPReservation>>,
}

impl fmt::Debug for ReservationLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReservationLookup").finish_non_exhaustive()
    }
}

impl ReservationLookup {
    /// Creates a lookup over the given reservation store.
    pub fn new(store: Arc<dyn ObjectStore<IPReservation>>) -> Self {
        Self { store }
    }

    /// Find the address reserved for `mac` in `family`
    ///
    /// Returns `Ok(None)` when no active reservation exists. If several match,
    /// the one with the lexicographically smallest name is used and the
    /// anomaly is logged.
    pub async fn find(&self, mac: &MacAddress, family: AddressFamily) -> Result<Option<IpAddr>, StoreError> {
        let key = mac::sanitized(mac);
        let reservations = self.store.list(&[(LABEL_MAC, key.as_str())]).await?;

        let mut candidates: Vec<(String, IpAddr)> = reservations
            .iter()
            .filter_map(|r| {
                r.reserved_addr()
                    .filter(|addr| family.matches(addr))
                    .map(|addr| (r.name_any(), addr))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        if candidates.len() > 1 {
            let names: Vec<&str> = candidates.iter().map(|(name, _)| name.as_str()).collect();
            warn!(
                "Found {} {} reservations for MAC {}, using {}: {:?}",
                candidates.len(),
                family,
                mac::canonical(mac),
                names[0],
                names
            );
        }

        let found = candidates.into_iter().next().map(|(_, addr)| addr);
        debug!("{} reservation for {}: {:?}", family, mac::canonical(mac), found);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use object_store::{MockObjectStore, MockOp};

    #[tokio::test]
    async fn test_find_returns_none_without_reservations() {
        let store = MockObjectStore::<IPReservation>::new();
        let lookup = ReservationLookup::new(Arc::new(store));
        let found = lookup.find(&test_mac(), AddressFamily::V6).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_find_filters_by_family() {
        let store = MockObjectStore::<IPReservation>::new();
        store.insert(create_test_reservation("v4", &test_mac(), "bar", Some("192.168.1.50")));
        store.insert(create_test_reservation("v6", &test_mac(), "foo", Some("fe80::a8bb:ccff:fedd:eeff")));
        let lookup = ReservationLookup::new(Arc::new(store));

        assert_eq!(
            lookup.find(&test_mac(), AddressFamily::V4).await.unwrap(),
            Some("192.168.1.50".parse().unwrap())
        );
        assert_eq!(
            lookup.find(&test_mac(), AddressFamily::V6).await.unwrap(),
            Some("fe80::a8bb:ccff:fedd:eeff".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_find_ignores_inactive_reservations() {
        let store = MockObjectStore::<IPReservation>::new();
        store.insert(create_test_reservation("pending", &test_mac(), "bar", None));
        let lookup = ReservationLookup::new(Arc::new(store));
        assert_eq!(lookup.find(&test_mac(), AddressFamily::V4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_ignores_other_macs() {
        let store = MockObjectStore::<IPReservation>::new();
        store.insert(create_test_reservation("other", &other_mac(), "bar", Some("192.168.1.60")));
        let lookup = ReservationLookup::new(Arc::new(store));
        assert_eq!(lookup.find(&test_mac(), AddressFamily::V4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_picks_smallest_name_on_duplicates() {
        let store = MockObjectStore::<IPReservation>::new();
        store.insert(create_test_reservation("test-b", &test_mac(), "bar", Some("192.168.1.51")));
        store.insert(create_test_reservation("test-a", &test_mac(), "bar", Some("192.168.1.50")));
        store.insert(create_test_reservation("test-c", &test_mac(), "bar", Some("192.168.1.52")));
        let lookup = ReservationLookup::new(Arc::new(store));
        assert_eq!(
            lookup.find(&test_mac(), AddressFamily::V4).await.unwrap(),
            Some("192.168.1.50".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_find_propagates_store_errors() {
        let store = MockObjectStore::<IPReservation>::new();
        store.fail_next(MockOp::List, StoreError::Timeout("list".to_string()));
        let lookup = ReservationLookup::new(Arc::new(store));
        assert!(matches!(
            lookup.find(&test_mac(), AddressFamily::V4).await,
            Err(StoreError::Timeout(_))
        ));
    }
}
