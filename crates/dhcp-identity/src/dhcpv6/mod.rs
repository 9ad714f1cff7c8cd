//! DHCPv6 support built on `dhcproto::v6`: relay framing and the relay-aware
//! request decoder.

pub mod decoder;
pub mod relay;

pub use decoder::{decode, DecodedRequest};
pub use dhcproto::v6::{DhcpOption, DhcpOptions, IAAddr, IANA, Message, MessageType, OptionCode};
pub use relay::{Packet, RelayEnvelope};

/// Empty reply to `request`: Advertise for a Solicit, Reply otherwise
///
/// Carries the request's transaction id and Client Identifier and the given
/// Server Identifier.
pub fn reply_to(request: &Message, server_id: &[u8]) -> Message {
    let msg_type = match request.msg_type() {
        MessageType::Solicit => MessageType::Advertise,
        _ => MessageType::Reply,
    };
    let mut reply = Message::new_with_id(msg_type, request.xid());
    if let Some(client_id) = request.opts().get(OptionCode::ClientId) {
        reply.opts_mut().insert(client_id.clone());
    }
    reply.opts_mut().insert(DhcpOption::ServerId(server_id.to_vec()));
    reply
}

/// First IA_NA option of `msg`
pub fn ia_na(msg: &Message) -> Option<&IANA> {
    match msg.opts().get(OptionCode::IANA) {
        Some(DhcpOption::IANA(ia)) => Some(ia),
        _ => None,
    }
}

/// Addresses carried in `ia`
pub fn ia_addresses(ia: &IANA) -> impl Iterator<Item = &IAAddr> {
    ia.opts.iter().filter_map(|opt| match opt {
        DhcpOption::IAAddr(addr) => Some(addr),
        _ => None,
    })
}
