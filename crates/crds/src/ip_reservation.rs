//! IPReservation CRD
//!
//! Binds a MAC address to an IP address within a subnet. Reservations are
//! looked up by the `mac` label and are considered active once
//! `status.reserved` has been set by the IPAM backend.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Label carrying the sanitized MAC address (colons stripped)
pub const LABEL_MAC: &str = "mac";

/// Label carrying the reserved address (`:` replaced by `_` to satisfy label syntax)
pub const LABEL_IP: &str = "ip";

/// Label naming the subsystem that created the reservation
pub const LABEL_ORIGIN: &str = "origin";

/// IPReservationSpec defines the desired address binding
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "IPReservation",
    namespaced,
    status = "IPReservationStatus",
    printcolumn = r#"{"name":"IP", "type":"string", "jsonPath":".spec.ip"}"#,
    printcolumn = r#"{"name":"Subnet", "type":"string", "jsonPath":".spec.subnet.name"}"#,
    printcolumn = r#"{"name":"Reserved", "type":"string", "jsonPath":".status.reserved"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IPReservationSpec {
    /// Requested IP address
    pub ip: String,

    /// Subnet the address is reserved from
    pub subnet: SubnetRef,
}

/// Reference to a subnet in the same namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetRef {
    /// Name of the subnet
    pub name: String,
}

/// IPReservationStatus defines the observed state of a reservation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IPReservationStatus {
    /// Address actually reserved by the IPAM backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<String>,
}

impl IPReservation {
    /// Returns the reserved address if the reservation is active and parses
    pub fn reserved_addr(&self) -> Option<IpAddr> {
        self.status
            .as_ref()
            .and_then(|s| s.reserved.as_deref())
            .and_then(|addr| addr.parse().ok())
    }
}

/// Encodes an IP address for use as a label value
pub fn ip_label_value(ip: &IpAddr) -> String {
    ip.to_string().replace(':', "_")
}
