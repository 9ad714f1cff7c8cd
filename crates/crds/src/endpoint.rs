//! Endpoint CRD
//!
//! Records the observed binding between a machine's MAC address and the IP
//! address it was resolved to during network boot.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// EndpointSpec defines the observed MAC/IP binding of a machine
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "Endpoint",
    namespaced,
    printcolumn = r#"{"name":"MAC", "type":"string", "jsonPath":".spec.macAddress"}"#,
    printcolumn = r#"{"name":"IP", "type":"string", "jsonPath":".spec.ip"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    /// MAC address in lowercase colon-hex form (e.g. "aa:bb:cc:dd:ee:ff")
    pub mac_address: String,

    /// IP address (IPv4 or IPv6) bound to the MAC address
    pub ip: String,
}

impl EndpointSpec {
    /// Whether the spec differs from `other` in any bound field
    ///
    /// IPs are compared as addresses, so "fe80::1" and "FE80:0:0:0:0:0:0:1"
    /// are equal. Values that do not parse are compared as strings.
    pub fn differs_from(&self, other: &EndpointSpec) -> bool {
        self.mac_address != other.mac_address || !same_ip(&self.ip, &other.ip)
    }
}

fn same_ip(a: &str, b: &str) -> bool {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
