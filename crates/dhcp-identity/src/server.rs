//! UDP front end.
//!
//! Receives datagrams on the configured DHCPv4 and DHCPv6 sockets and hands
//! each one to its own task. DHCPv6 replies are wrapped in a Relay-Reply and
//! sent back to the relay they came from. DHCPv4 is observe-only: bindings
//! are reconciled but the site's DHCPv4 server does the answering.

use crate::dhcpv4;
use crate::dhcpv6::{self, Message, MessageType, Packet};
use crate::handler::{Handler4, Handler6, Outcome};
use crate::plugin::Plugin;
use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const MAX_DATAGRAM: usize = 1500;
const DUID_LL: u16 = 3;
const HTYPE_ETHERNET: u16 = 1;

/// DHCPv4/DHCPv6 UDP server driving a `Plugin`
#[derive(Debug, Clone)]
pub struct DhcpServer {
    plugin: Plugin,
    server_id: Bytes,
    dhcp4_bind: Option<SocketAddr>,
    dhcp6_bind: Option<SocketAddr>,
}

impl DhcpServer {
    /// Create a server; `None` binds disable the corresponding listener
    pub fn new(plugin: Plugin, dhcp4_bind: Option<SocketAddr>, dhcp6_bind: Option<SocketAddr>) -> Self {
        Self {
            plugin,
            server_id: server_duid(),
            dhcp4_bind,
            dhcp6_bind,
        }
    }

    /// Run both listeners until `shutdown` flips to `true` or its sender is dropped
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let v4 = async {
            match self.dhcp4_bind {
                Some(addr) => self.serve_v4(addr, shutdown.clone()).await,
                None => Ok(()),
            }
        };
        let v6 = async {
            match self.dhcp6_bind {
                Some(addr) => self.serve_v6(addr, shutdown.clone()).await,
                None => Ok(()),
            }
        };
        if self.dhcp4_bind.is_none() && self.dhcp6_bind.is_none() {
            warn!("No DHCP listener configured");
        }
        tokio::try_join!(v4, v6)?;
        Ok(())
    }

    /// Serve DHCPv4 on `addr`
    pub async fn serve_v4(&self, addr: SocketAddr, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let socket = UdpSocket::bind(addr).await?;
        info!("DHCPv4 listener started on {}", addr);
        let mut buf = [0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, src)) => {
                            let handler = self.plugin.handler4.clone();
                            let datagram = Bytes::copy_from_slice(&buf[..len]);
                            tokio::spawn(async move {
                                observe4(&handler, &datagram, src).await;
                            });
                        }
                        Err(e) => error!("Error receiving DHCPv4 packet: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("DHCPv4 listener shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Serve DHCPv6 on `addr`
    pub async fn serve_v6(&self, addr: SocketAddr, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("DHCPv6 listener started on {}", addr);
        let mut buf = [0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, src)) => {
                            let handler = self.plugin.handler6.clone();
                            let server_id = self.server_id.clone();
                            let socket = Arc::clone(&socket);
                            let datagram = Bytes::copy_from_slice(&buf[..len]);
                            tokio::spawn(async move {
                                let Some(reply) = respond6(&handler, &datagram, &server_id).await else {
                                    return;
                                };
                                if let Err(e) = socket.send_to(&reply, src).await {
                                    error!("Failed to send DHCPv6 reply to {}: {}", src, e);
                                } else {
                                    debug!("Sent DHCPv6 reply to {}", src);
                                }
                            });
                        }
                        Err(e) => error!("Error receiving DHCPv6 packet: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("DHCPv6 listener shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn observe4(handler: &Handler4, datagram: &[u8], src: SocketAddr) {
    let request = match dhcpv4::parse(datagram) {
        Ok(request) => request,
        Err(e) => {
            debug!("Ignoring undecodable DHCPv4 datagram from {}: {}", src, e);
            return;
        }
    };
    let result = handler.handle(&request, ()).await;
    debug!("DHCPv4 datagram from {} handled: {:?}", src, result.outcome);
}

/// Handle one DHCPv6 datagram and return the encoded Relay-Reply, if any
///
/// A reply is only sent for machines that resolved; everything else is left
/// to other DHCPv6 servers on the link.
pub async fn respond6(handler: &Handler6, datagram: &[u8], server_id: &[u8]) -> Option<Vec<u8>> {
    let packet = match Packet::decode(datagram) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("Ignoring undecodable DHCPv6 datagram: {}", e);
            return None;
        }
    };

    let stub = match &packet {
        Packet::Relay(relay) => match relay.inner() {
            Ok(inner) => dhcpv6::reply_to(&inner, server_id),
            Err(_) => Message::new_with_id(MessageType::Reply, [0; 3]),
        },
        Packet::Message(msg) => dhcpv6::reply_to(msg, server_id),
    };

    let result = handler.handle(&packet, stub).await;
    let reply = match (result.outcome, result.response) {
        (Outcome::Resolved | Outcome::ResolvedNoOptionResponse, Some(reply)) => reply,
        _ => return None,
    };
    let Packet::Relay(relay) = &packet else {
        return None;
    };
    match relay.reply_with(&reply).and_then(|relay_reply| relay_reply.encode()) {
        Ok(wire) => Some(wire),
        Err(e) => {
            error!("Failed to encode DHCPv6 Relay-Reply: {}", e);
            None
        }
    }
}

/// DUID-LL built from the first local interface MAC, or all zeroes
fn server_duid() -> Bytes {
    let mac = match mac_address::get_mac_address() {
        Ok(Some(mac)) => mac,
        Ok(None) => {
            warn!("No local MAC address found, using zero server DUID");
            mac_address::MacAddress::new([0; 6])
        }
        Err(e) => {
            warn!("Failed to read local MAC address, using zero server DUID: {}", e);
            mac_address::MacAddress::new([0; 6])
        }
    };
    let mut duid = BytesMut::with_capacity(10);
    duid.put_u16(DUID_LL);
    duid.put_u16(HTYPE_ETHERNET);
    duid.put_slice(&mac.bytes());
    duid.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AddressSource, Config};
    use crate::eui64;
    use crate::test_utils::*;
    use crds::{Endpoint, IPReservation};
    use object_store::MockObjectStore;

    fn plugin(inventory: bool) -> (Plugin, MockObjectStore<Endpoint>) {
        let config = Config {
            address_source: AddressSource::RelayDerived,
            ..Config::default()
        };
        let endpoints = MockObjectStore::<Endpoint>::new();
        let plugin = Plugin::with_inventory(
            &config,
            inventory.then(test_inventory),
            Arc::new(MockObjectStore::<IPReservation>::new()),
            Arc::new(endpoints.clone()),
        )
        .unwrap();
        (plugin, endpoints)
    }

    #[test]
    fn test_server_duid_is_link_layer() {
        let duid = server_duid();
        assert_eq!(duid.len(), 10);
        assert_eq!(&duid[..4], &[0, 3, 0, 1]);
    }

    #[tokio::test]
    async fn test_respond6_wraps_reply_in_relay_reply() {
        let (plugin, endpoints) = plugin(true);
        let request = relayed_request(&test_mac(), true);

        let wire = respond6(&plugin.handler6, &request.encode().unwrap(), b"srv")
            .await
            .unwrap();

        let Packet::Relay(relay) = Packet::decode(&wire).unwrap() else {
            panic!("expected a relay reply");
        };
        assert_eq!(relay.msg_type, MessageType::RelayRepl);
        assert_eq!(relay.link_addr, relay_link_addr(&test_mac()));

        let reply = relay.inner().unwrap();
        assert_eq!(reply.msg_type(), MessageType::Reply);
        assert_eq!(reply.xid(), [0x12, 0x34, 0x56]);
        let ia = dhcpv6::ia_na(&reply).unwrap();
        let addr = dhcpv6::ia_addresses(ia).next().unwrap().addr;
        assert_eq!(addr, eui64::from_mac(eui64::LINK_LOCAL_PREFIX, &test_mac()));
        assert!(endpoints.peek(TEST_MACHINE).is_some());
    }

    #[tokio::test]
    async fn test_respond6_stays_silent_for_unknown_machines() {
        let (plugin, endpoints) = plugin(true);
        let request = relayed_request(&unknown_mac(), true);

        let reply = respond6(&plugin.handler6, &request.encode().unwrap(), b"srv").await;
        assert!(reply.is_none());
        assert!(endpoints.is_empty());
    }

    #[tokio::test]
    async fn test_respond6_ignores_direct_and_garbage_datagrams() {
        let (plugin, _) = plugin(false);
        let direct = Packet::Message(Message::new_with_id(MessageType::Solicit, [1, 2, 3]));

        assert!(respond6(&plugin.handler6, &direct.encode().unwrap(), b"").await.is_none());
        assert!(respond6(&plugin.handler6, &[0xff, 0x00], b"").await.is_none());
        assert!(respond6(&plugin.handler6, &[], b"").await.is_none());
    }

    #[tokio::test]
    async fn test_server_without_listeners_returns_on_run() {
        let (plugin, _) = plugin(false);
        let server = DhcpServer::new(plugin, None, None);
        let (_tx, rx) = watch::channel(false);
        server.run(rx).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let (plugin, _) = plugin(false);
        let server = DhcpServer::new(plugin, Some("127.0.0.1:0".parse().unwrap()), None);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { server.run(rx).await });
        tokio::task::yield_now().await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_server_stops_when_shutdown_sender_is_dropped() {
        let (plugin, _) = plugin(false);
        let server = DhcpServer::new(plugin, Some("127.0.0.1:0".parse().unwrap()), None);
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), server.run(rx)).await;
        assert!(result.expect("listener kept running without a shutdown sender").is_ok());
    }
}
