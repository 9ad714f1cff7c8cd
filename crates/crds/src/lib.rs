//! DCops CRD Definitions
//!
//! Kubernetes Custom Resource Definitions written by the DHCP identity stage:
//! - `Endpoint`: observed MAC/IP binding of a known machine
//! - `IPReservation`: MAC-to-address reservation within a subnet

pub mod endpoint;
pub mod ip_reservation;

pub use endpoint::*;
pub use ip_reservation::*;
