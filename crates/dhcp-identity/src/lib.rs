//! DHCP Machine Identity
//!
//! Resolves the identity of bare-metal machines booting over the network from
//! their DHCP requests and reconciles that identity into `Endpoint` and
//! `IPReservation` records.
//!
//! Each inbound packet flows through three stages with no state carried
//! between packets:
//! - **Decode**: DHCPv4 hardware address, or DHCPv6 relay unwrapping with
//!   EUI-64 MAC recovery
//! - **Resolve**: inventory lookup and reservation lookup
//! - **Reconcile**: endpoint upsert and/or owned reservation replace-on-change
//!
//! The only shared state is the read-only inventory and the object store, so
//! handlers can be invoked concurrently from any number of tasks.

pub mod config;
pub mod dhcpv4;
pub mod dhcpv6;
pub mod error;
pub mod eui64;
pub mod handler;
pub mod inventory;
pub mod mac;
pub mod plugin;
pub mod reconciler;
pub mod reservation;
pub mod resolver;
pub mod server;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{AddressSource, Config, ReconcileMode};
pub use error::*;
pub use handler::{Handler4, Handler6, HandlerResult, Outcome, Pipeline};
pub use inventory::Inventory;
pub use plugin::Plugin;
pub use server::DhcpServer;
