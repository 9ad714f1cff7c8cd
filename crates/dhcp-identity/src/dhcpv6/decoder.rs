//! DHCPv6 request decoder.
//!
//! Only relay-encapsulated requests are serviced. The client's link-local
//! address is taken to be the relay's link address plus one in the low-order
//! byte, and the client MAC is recovered from it by EUI-64 decoding. Relays
//! that instead forward the client's own EUI-64 link-local address as peer
//! address are handled by falling back to the peer address.

use super::{ia_na, Message, Packet, RelayEnvelope, IANA};
use crate::error::DecodeError;
use crate::eui64;
use mac_address::MacAddress;
use std::net::Ipv6Addr;

/// Result of decoding a relayed DHCPv6 request
#[derive(Debug, Clone)]
pub struct DecodedRequest {
    /// Hardware address of the requesting machine
    pub mac: MacAddress,
    /// Client link-local address the MAC was recovered from
    pub link_local_addr: Ipv6Addr,
    /// The client message inside the relay envelope
    pub inner: Message,
    /// Address request, if the client sent one
    pub requested_ia: Option<IANA>,
}

/// Decode a relayed DHCPv6 request
///
/// Fails with `DecodeError::NotRelayed` for direct client messages, and with
/// `DecodeError::Decapsulation` if the envelope does not carry exactly one
/// level of relay around a client message.
pub fn decode(request: &Packet) -> Result<DecodedRequest, DecodeError> {
    let Packet::Relay(relay) = request else {
        return Err(DecodeError::NotRelayed);
    };

    let inner = relay.inner()?;
    let (mac, link_local_addr) = client_hardware_address(relay)?;
    let requested_ia = ia_na(&inner).cloned();

    Ok(DecodedRequest {
        mac,
        link_local_addr,
        inner,
        requested_ia,
    })
}

fn client_hardware_address(relay: &RelayEnvelope) -> Result<(MacAddress, Ipv6Addr), DecodeError> {
    let derived = eui64::next_host(&relay.link_addr);
    if let Some(mac) = eui64::to_mac(&derived) {
        return Ok((mac, derived));
    }
    if let Some(mac) = eui64::to_mac(&relay.peer_addr) {
        return Ok((mac, relay.peer_addr));
    }
    Err(DecodeError::NoHardwareAddress(format!(
        "neither link address {} + 1 nor peer address {} is EUI-64 derived",
        relay.link_addr, relay.peer_addr
    )))
}
