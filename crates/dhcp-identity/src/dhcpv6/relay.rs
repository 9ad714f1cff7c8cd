//! Relay-Forward and Relay-Reply framing.
//!
//! `dhcproto` decodes the payload of a Relay-Message option as another relay
//! header, which breaks for the common case of a relay carrying a client
//! message. The envelope is therefore walked option by option with
//! `dhcproto::Decoder` and the payload is kept as raw bytes until the caller
//! asks for the client message inside.

use crate::error::DecodeError;
use dhcproto::error::{DecodeError as WireDecodeError, EncodeError};
use dhcproto::v6::{DhcpOption, Message, MessageType, OptionCode};
use dhcproto::{Decodable, Decoder, Encodable, Encoder};
use std::net::Ipv6Addr;

/// A DHCPv6 datagram as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Client or server message sent without a relay
    Message(Message),
    /// Relay-Forward or Relay-Reply envelope
    Relay(RelayEnvelope),
}

impl Packet {
    /// Decode a datagram, dispatching on its message type
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let Some(&first) = buf.first() else {
            return Err(DecodeError::Truncated("empty DHCPv6 datagram".to_string()));
        };
        if is_relay(first) {
            RelayEnvelope::decode(buf).map(Packet::Relay)
        } else {
            Message::from_bytes(buf).map(Packet::Message).map_err(malformed)
        }
    }

    /// Wire form of the packet
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            Packet::Message(msg) => msg.to_vec(),
            Packet::Relay(relay) => relay.encode(),
        }
    }
}

/// One level of relay encapsulation
///
/// Options other than Interface-ID and Relay-Message are not kept; neither
/// is needed to answer through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEnvelope {
    /// `RelayForw` or `RelayRepl`
    pub msg_type: MessageType,
    /// Number of relays the message has passed through
    pub hop_count: u8,
    /// Address identifying the client's link
    pub link_addr: Ipv6Addr,
    /// Address the relay received the client message from
    pub peer_addr: Ipv6Addr,
    /// Interface-ID option, echoed back in the Relay-Reply
    pub interface_id: Option<Vec<u8>>,
    /// Undecoded payload of the Relay-Message option
    pub relay_msg: Option<Vec<u8>>,
}

impl RelayEnvelope {
    /// Relay-Forward carrying `payload`, an encoded DHCPv6 message
    pub fn forward(payload: Vec<u8>, link_addr: Ipv6Addr, peer_addr: Ipv6Addr) -> Self {
        Self {
            msg_type: MessageType::RelayForw,
            hop_count: 0,
            link_addr,
            peer_addr,
            interface_id: None,
            relay_msg: Some(payload),
        }
    }

    /// Decode a relay envelope, keeping the Relay-Message payload raw
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(buf);
        let msg_type = MessageType::from(decoder.read_u8().map_err(truncated)?);
        let hop_count = decoder.read_u8().map_err(truncated)?;
        let link_addr = Ipv6Addr::from(decoder.read::<16>().map_err(truncated)?);
        let peer_addr = Ipv6Addr::from(decoder.read::<16>().map_err(truncated)?);

        let mut interface_id = None;
        let mut relay_msg = None;
        while !decoder.buffer().is_empty() {
            let code = OptionCode::from(decoder.read_u16().map_err(truncated)?);
            let len = decoder.read_u16().map_err(truncated)? as usize;
            let data = decoder.read_slice(len).map_err(truncated)?;
            match code {
                OptionCode::RelayMsg => relay_msg = Some(data.to_vec()),
                OptionCode::InterfaceId => interface_id = Some(data.to_vec()),
                _ => {}
            }
        }

        Ok(Self {
            msg_type,
            hop_count,
            link_addr,
            peer_addr,
            interface_id,
            relay_msg,
        })
    }

    /// The client message carried in the Relay-Message option
    ///
    /// Fails with `DecodeError::Decapsulation` when the option is missing or
    /// holds another relay envelope.
    pub fn inner(&self) -> Result<Message, DecodeError> {
        let Some(payload) = &self.relay_msg else {
            return Err(DecodeError::Decapsulation(
                "relay message carries no Relay-Message option".to_string(),
            ));
        };
        match payload.first() {
            None => Err(DecodeError::Decapsulation("empty Relay-Message option".to_string())),
            Some(&first) if is_relay(first) => Err(DecodeError::Decapsulation(
                "nested relay messages are not supported".to_string(),
            )),
            Some(_) => Message::from_bytes(payload).map_err(malformed),
        }
    }

    /// Relay-Reply that sends `reply` back through the same relay
    pub fn reply_with(&self, reply: &Message) -> Result<Self, EncodeError> {
        Ok(Self {
            msg_type: MessageType::RelayRepl,
            hop_count: self.hop_count,
            link_addr: self.link_addr,
            peer_addr: self.peer_addr,
            interface_id: self.interface_id.clone(),
            relay_msg: Some(reply.to_vec()?),
        })
    }

    /// Wire form of the envelope
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        e.write_u8(self.msg_type.into())?;
        e.write_u8(self.hop_count)?;
        e.write(self.link_addr.octets())?;
        e.write(self.peer_addr.octets())?;
        if let Some(id) = &self.interface_id {
            DhcpOption::InterfaceId(id.clone()).encode(&mut e)?;
        }
        if let Some(payload) = &self.relay_msg {
            let len = u16::try_from(payload.len()).map_err(|_| EncodeError::AddOverflow)?;
            e.write_u16(OptionCode::RelayMsg.into())?;
            e.write_u16(len)?;
            e.write_slice(payload)?;
        }
        Ok(buf)
    }
}

fn is_relay(msg_type: u8) -> bool {
    matches!(
        MessageType::from(msg_type),
        MessageType::RelayForw | MessageType::RelayRepl
    )
}

fn truncated(e: WireDecodeError) -> DecodeError {
    DecodeError::Truncated(e.to_string())
}

fn malformed(e: WireDecodeError) -> DecodeError {
    DecodeError::Malformed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{relay_link_addr, relayed_request, test_mac};

    #[test]
    fn test_relay_forward_survives_the_wire() {
        let request = relayed_request(&test_mac(), true);
        let wire = request.encode().unwrap();

        assert_eq!(wire[0], 12);
        assert_eq!(Packet::decode(&wire).unwrap(), request);
    }

    #[test]
    fn test_inner_decodes_client_message_shorter_than_relay_header() {
        let short = Message::new_with_id(MessageType::Request, [1, 2, 3]).to_vec().unwrap();
        assert!(short.len() < 34);

        let relay = RelayEnvelope::forward(short, relay_link_addr(&test_mac()), Ipv6Addr::UNSPECIFIED);
        let Packet::Relay(decoded) = Packet::decode(&relay.encode().unwrap()).unwrap() else {
            panic!("expected a relay envelope");
        };
        let inner = decoded.inner().unwrap();
        assert_eq!(inner.msg_type(), MessageType::Request);
        assert_eq!(inner.xid(), [1, 2, 3]);
    }

    #[test]
    fn test_unknown_relay_options_are_skipped() {
        let mut wire = RelayEnvelope::forward(vec![], Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST)
            .encode()
            .unwrap();
        wire.truncate(34);
        wire.extend_from_slice(&[0, 37, 0, 2, 0xde, 0xad]);
        wire.extend_from_slice(&[0, 18, 0, 4]);
        wire.extend_from_slice(b"eth0");

        let relay = RelayEnvelope::decode(&wire).unwrap();
        assert_eq!(relay.interface_id.as_deref(), Some(&b"eth0"[..]));
        assert!(relay.relay_msg.is_none());
    }

    #[test]
    fn test_reply_echoes_interface_id() {
        let Packet::Relay(mut relay) = relayed_request(&test_mac(), false) else {
            panic!("expected a relay envelope");
        };
        relay.hop_count = 2;
        relay.interface_id = Some(b"eth0".to_vec());
        let reply = Message::new_with_id(MessageType::Reply, [0x12, 0x34, 0x56]);

        let wire = relay.reply_with(&reply).unwrap().encode().unwrap();
        let decoded = RelayEnvelope::decode(&wire).unwrap();
        assert_eq!(decoded.msg_type, MessageType::RelayRepl);
        assert_eq!(decoded.hop_count, 2);
        assert_eq!(decoded.link_addr, relay.link_addr);
        assert_eq!(decoded.interface_id, Some(b"eth0".to_vec()));
        assert_eq!(decoded.inner().unwrap(), reply);
    }

    #[test]
    fn test_truncated_datagrams_are_rejected() {
        assert!(matches!(Packet::decode(&[]), Err(DecodeError::Truncated(_))));
        assert!(matches!(Packet::decode(&[12, 0, 0xfe]), Err(DecodeError::Truncated(_))));

        let mut wire = relayed_request(&test_mac(), true).encode().unwrap();
        wire.truncate(wire.len() - 3);
        assert!(matches!(Packet::decode(&wire), Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn test_empty_relay_payload_is_not_a_message() {
        let relay = RelayEnvelope::forward(vec![], Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST);
        assert!(matches!(relay.inner(), Err(DecodeError::Decapsulation(_))));
    }
}
