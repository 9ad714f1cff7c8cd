//! Identity resolution.
//!
//! Decides, for a decoded MAC address, whether the machine is known and which
//! address belongs to it:
//! - with an inventory configured, the MAC must be listed; its name is the identity
//! - without an inventory, the sanitized MAC itself is the identity
//! - the address comes from the reservation store, or from the relay-derived
//!   link-local address when configured to do so

use crate::config::AddressSource;
use crate::inventory::Inventory;
use crate::mac;
use crate::reservation::{AddressFamily, ReservationLookup};
use mac_address::MacAddress;
use object_store::StoreError;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// A known machine bound to an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Machine identity, used as the Endpoint name
    pub identity: String,
    /// Hardware address the request came from
    pub mac: MacAddress,
    /// Address the machine is bound to
    pub address: IpAddr,
}

/// Outcome of resolving a MAC address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// MAC is not in the inventory
    Unknown,
    /// Machine is known but has no address
    NoAddress {
        /// Machine identity
        identity: String,
    },
    /// Machine is known and has an address
    Resolved(Binding),
}

/// Resolves MAC addresses to machine identities and addresses
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    inventory: Option<Arc<Inventory>>,
    lookup: ReservationLookup,
    address_source: AddressSource,
}

impl IdentityResolver {
    /// Creates a new resolver.
    ///
    /// `inventory` of `None` means every MAC is known under its sanitized form.
    pub fn new(inventory: Option<Arc<Inventory>>, lookup: ReservationLookup, address_source: AddressSource) -> Self {
        Self {
            inventory,
            lookup,
            address_source,
        }
    }

    /// Identity of the machine owning `mac`, if known
    pub fn identify(&self, mac: &MacAddress) -> Option<String> {
        match &self.inventory {
            Some(inventory) => inventory.lookup(mac).map(str::to_string),
            None => Some(mac::sanitized(mac)),
        }
    }

    /// Resolve `mac` in `family`
    ///
    /// `derived` is the address recovered from the packet itself (the relay
    /// link-local address for DHCPv6), used when the address source is
    /// `AddressSource::RelayDerived`.
    pub async fn resolve(
        &self,
        mac: &MacAddress,
        family: AddressFamily,
        derived: Option<IpAddr>,
    ) -> Result<Resolution, StoreError> {
        let Some(identity) = self.identify(mac) else {
            info!("Unknown machine {}, ignoring", mac::canonical(mac));
            return Ok(Resolution::Unknown);
        };

        let address = match (self.address_source, derived) {
            (AddressSource::RelayDerived, Some(addr)) if family.matches(&addr) => Some(addr),
            _ => self.lookup.find(mac, family).await?,
        };

        match address {
            Some(address) => {
                debug!("Resolved {} ({}) to {}", identity, mac::canonical(mac), address);
                Ok(Resolution::Resolved(Binding {
                    identity,
                    mac: *mac,
                    address,
                }))
            }
            None => {
                info!(
                    "Machine {} ({}) has no {} address, ignoring",
                    identity,
                    mac::canonical(mac),
                    family
                );
                Ok(Resolution::NoAddress { identity })
            }
        }
    }
}
