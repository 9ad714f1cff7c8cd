//! Test utilities for creating fixtures

use crate::dhcpv6::{DhcpOption, DhcpOptions, IANA, Message, MessageType, Packet, RelayEnvelope};
use crate::eui64;
use crate::inventory::{Inventory, InventoryEntry};
use crate::mac;
use crds::{Endpoint, EndpointSpec, IPReservation, IPReservationSpec, IPReservationStatus, LABEL_MAC, SubnetRef};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use mac_address::MacAddress;
use std::collections::BTreeMap;
use std::net::Ipv6Addr;

pub const TEST_MACHINE: &str = "compute-1";
pub const OTHER_MACHINE: &str = "compute-2";
pub const TEST_IAID: u32 = 0x0102_0304;

/// MAC of `TEST_MACHINE`
pub fn test_mac() -> MacAddress {
    MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
}

/// MAC of `OTHER_MACHINE`, which has no reservations in the fixtures
pub fn other_mac() -> MacAddress {
    MacAddress::new([0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22])
}

/// MAC absent from the test inventory
pub fn unknown_mac() -> MacAddress {
    MacAddress::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
}

pub fn test_inventory() -> Inventory {
    Inventory::from_entries([
        InventoryEntry {
            name: TEST_MACHINE.to_string(),
            mac_address: mac::canonical(&test_mac()),
        },
        InventoryEntry {
            name: OTHER_MACHINE.to_string(),
            mac_address: mac::canonical(&other_mac()),
        },
    ])
}

/// Link address a relay reports for the machine owning `mac`
pub fn relay_link_addr(mac: &MacAddress) -> Ipv6Addr {
    let mut octets = eui64::from_mac(eui64::LINK_LOCAL_PREFIX, mac).octets();
    octets[15] = octets[15].wrapping_sub(1);
    Ipv6Addr::from(octets)
}

/// A Request from `mac`, relayed once
pub fn relayed_request(mac: &MacAddress, with_ia: bool) -> Packet {
    let mut request = Message::new_with_id(MessageType::Request, [0x12, 0x34, 0x56]);
    let mut duid = vec![0, 3, 0, 1];
    duid.extend_from_slice(&mac.bytes());
    request.opts_mut().insert(DhcpOption::ClientId(duid));
    if with_ia {
        request.opts_mut().insert(DhcpOption::IANA(IANA {
            id: TEST_IAID,
            t1: 3600,
            t2: 5400,
            opts: DhcpOptions::new(),
        }));
    }
    let payload = Packet::Message(request).encode().unwrap();
    Packet::Relay(RelayEnvelope::forward(payload, relay_link_addr(mac), Ipv6Addr::UNSPECIFIED))
}

/// The client message inside a packet built by `relayed_request`
pub fn inner_message(packet: &Packet) -> Message {
    match packet {
        Packet::Relay(relay) => relay.inner().unwrap(),
        Packet::Message(msg) => msg.clone(),
    }
}

/// An IPReservation labelled with `mac`; active when `reserved` is set
pub fn create_test_reservation(name: &str, mac: &MacAddress, subnet: &str, reserved: Option<&str>) -> IPReservation {
    IPReservation {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: Some(BTreeMap::from([(LABEL_MAC.to_string(), mac::sanitized(mac))])),
            ..Default::default()
        },
        spec: IPReservationSpec {
            ip: reserved.unwrap_or_default().to_string(),
            subnet: SubnetRef {
                name: subnet.to_string(),
            },
        },
        status: reserved.map(|addr| IPReservationStatus {
            reserved: Some(addr.to_string()),
        }),
    }
}

pub fn create_test_endpoint(name: &str, mac_address: &str, ip: &str) -> Endpoint {
    Endpoint {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: EndpointSpec {
            mac_address: mac_address.to_string(),
            ip: ip.to_string(),
        },
    }
}
