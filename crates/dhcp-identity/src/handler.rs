//! Per-packet handlers.
//!
//! A handler takes the inbound request and the response built so far by the
//! host server, and returns the response to hand to the next stage together
//! with whether the chain should stop. Handlers hold no per-packet state and
//! can be shared across tasks.

use crate::dhcpv4;
use crate::dhcpv6::{self, DhcpOption, IAAddr, IANA, Message, Packet};
use crate::error::HandlerError;
use crate::mac;
use crate::reconciler::Reconcile;
use crate::reservation::AddressFamily;
use crate::resolver::{IdentityResolver, Resolution};
use mac_address::MacAddress;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Preferred and valid lifetime of addresses handed out in replies (24h)
pub const ADDRESS_LIFETIME: u32 = 86_400;

/// Terminal state of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Packet could not be decoded
    Dropped,
    /// Machine is not known
    Ignored,
    /// Machine is known but has no address
    IgnoredNoAddress,
    /// Machine resolved and reconciled
    Resolved,
    /// Machine resolved and reconciled, but the client asked for no address
    ResolvedNoOptionResponse,
    /// Object store failure
    Failed,
}

/// What a handler hands back to the host server
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult<R> {
    /// Response for the next stage, `None` when nothing must be sent
    pub response: Option<R>,
    /// Whether later stages must be skipped
    pub stop: bool,
    /// How the packet was handled
    pub outcome: Outcome,
}

impl<R> HandlerResult<R> {
    fn pass(response: R, outcome: Outcome) -> Self {
        Self {
            response: Some(response),
            stop: false,
            outcome,
        }
    }

    fn halt(outcome: Outcome) -> Self {
        Self {
            response: None,
            stop: true,
            outcome,
        }
    }
}

/// Resolution followed by every configured reconciler
pub struct Pipeline {
    resolver: IdentityResolver,
    reconcilers: Vec<Box<dyn Reconcile>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.reconcilers.iter().map(|r| r.name()).collect();
        f.debug_struct("Pipeline")
            .field("resolver", &self.resolver)
            .field("reconcilers", &names)
            .finish()
    }
}

impl Pipeline {
    /// Resolve with `resolver`, then run `reconcilers` in order
    pub fn new(resolver: IdentityResolver, reconcilers: Vec<Box<dyn Reconcile>>) -> Self {
        Self { resolver, reconcilers }
    }

    /// Resolve `mac` and, if it resolves, reconcile the binding
    ///
    /// Reconcilers run in order; the first failure aborts the rest.
    pub async fn run(
        &self,
        mac: &MacAddress,
        family: AddressFamily,
        derived: Option<IpAddr>,
    ) -> Result<Resolution, HandlerError> {
        let resolution = self.resolver.resolve(mac, family, derived).await?;
        if let Resolution::Resolved(binding) = &resolution {
            for reconciler in &self.reconcilers {
                let outcome = reconciler.reconcile(binding).await?;
                debug!(
                    "{} reconciler for {} ({}): {:?}",
                    reconciler.name(),
                    binding.identity,
                    mac::canonical(mac),
                    outcome
                );
            }
        }
        Ok(resolution)
    }
}

/// Maps a resolution onto the outcome of an address-less (v4 or no-IA) request
fn outcome_of(resolution: &Resolution) -> Outcome {
    match resolution {
        Resolution::Unknown => Outcome::Ignored,
        Resolution::NoAddress { .. } => Outcome::IgnoredNoAddress,
        Resolution::Resolved(_) => Outcome::Resolved,
    }
}

/// DHCPv4 handler
///
/// Address assignment is reconciled into the object store only; the response
/// is passed through unmodified.
#[derive(Debug, Clone)]
pub struct Handler4 {
    pipeline: Arc<Pipeline>,
}

impl Handler4 {
    /// Create a handler driving `pipeline`
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Resolve and reconcile the sender of `request`, passing `response` on
    /// unchanged
    pub async fn handle<R>(&self, request: &dhcproto::v4::Message, response: R) -> HandlerResult<R> {
        let mac = match dhcpv4::decode(request) {
            Ok(mac) => mac,
            Err(e) => {
                warn!("Dropping DHCPv4 packet: {}", e);
                return HandlerResult::halt(Outcome::Dropped);
            }
        };

        match self.pipeline.run(&mac, AddressFamily::V4, None).await {
            Ok(resolution) => {
                let outcome = outcome_of(&resolution);
                info!("DHCPv4 {} -> {:?}", mac::canonical(&mac), outcome);
                HandlerResult::pass(response, outcome)
            }
            Err(e) => {
                error!("DHCPv4 {} failed: {}", mac::canonical(&mac), e);
                HandlerResult::halt(Outcome::Failed)
            }
        }
    }
}

/// DHCPv6 handler
///
/// Only relayed requests are serviced. When the machine resolves and asked for
/// an address, an IA_NA carrying its derived link-local address is appended
/// to the response.
#[derive(Debug, Clone)]
pub struct Handler6 {
    pipeline: Arc<Pipeline>,
}

impl Handler6 {
    /// Create a handler driving `pipeline`
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Resolve and reconcile the client inside relayed `request`, adding an
    /// address to `response` when the client asked for one
    pub async fn handle(&self, request: &Packet, mut response: Message) -> HandlerResult<Message> {
        let decoded = match dhcpv6::decode(request) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Dropping DHCPv6 packet: {}", e);
                return HandlerResult::halt(Outcome::Dropped);
            }
        };
        let mac = decoded.mac;
        let derived = IpAddr::V6(decoded.link_local_addr);

        let resolution = match self.pipeline.run(&mac, AddressFamily::V6, Some(derived)).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("DHCPv6 {} failed: {}", mac::canonical(&mac), e);
                return HandlerResult::halt(Outcome::Failed);
            }
        };

        let outcome = match (&resolution, &decoded.requested_ia) {
            (Resolution::Resolved(_), Some(requested)) => {
                response
                    .opts_mut()
                    .insert(DhcpOption::IANA(address_reply(requested, decoded.link_local_addr)));
                Outcome::Resolved
            }
            (Resolution::Resolved(_), None) => Outcome::ResolvedNoOptionResponse,
            (other, _) => outcome_of(other),
        };
        info!("DHCPv6 {} -> {:?}", mac::canonical(&mac), outcome);
        HandlerResult::pass(response, outcome)
    }
}

/// IA_NA answering `requested` with the single address `addr`
fn address_reply(requested: &IANA, addr: Ipv6Addr) -> IANA {
    let address = DhcpOption::IAAddr(IAAddr {
        addr,
        preferred_life: ADDRESS_LIFETIME,
        valid_life: ADDRESS_LIFETIME,
        opts: Default::default(),
    });
    IANA {
        id: requested.id,
        t1: 0,
        t2: 0,
        opts: std::iter::once(address).collect(),
    }
}
