//! DHCPv4 request decoding.
//!
//! The requester's hardware address is read straight from the `chaddr` header
//! field. Only Ethernet (6-byte) hardware addresses are accepted.

use crate::error::DecodeError;
use dhcproto::v4::{HType, Message};
use dhcproto::{Decodable, Decoder};
use mac_address::MacAddress;

const ETHERNET_HLEN: u8 = 6;

/// Parse a DHCPv4 packet from its wire form
pub fn parse(buf: &[u8]) -> Result<Message, DecodeError> {
    Message::decode(&mut Decoder::new(buf)).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Extract the requester's MAC address
pub fn decode(request: &Message) -> Result<MacAddress, DecodeError> {
    if request.htype() != HType::Eth || request.hlen() != ETHERNET_HLEN {
        return Err(DecodeError::UnsupportedHardware(format!(
            "htype {:?} with hlen {}",
            request.htype(),
            request.hlen()
        )));
    }
    let octets: [u8; 6] = request
        .chaddr()
        .get(..usize::from(ETHERNET_HLEN))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| DecodeError::Truncated(format!("chaddr of {} bytes", request.chaddr().len())))?;
    Ok(MacAddress::new(octets))
}
