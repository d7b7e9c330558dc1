//! The DNS layer's seams with the rest of the stack: the UDP collaborator
//! below it, the socket layer above it, and the operations the stack calls.
//!
//! Outbound, the UDP layer crafts the packet and owns everything under the
//! DNS byte range (headers, checksums, addressing); this layer only stamps
//! the DNS header and hands the packet back down. Inbound, every packet
//! that reaches [DnsLayer::decode] ends up at the socket layer, decoded or
//! not, so downstream dispatch sees the same stream the wire carried.

#[cfg(feature = "logging")]
use crate::log::{trace, warn};
use crate::dns_wire::{write_query_header, DnsResponse, DNS_PORT, HEADER_LEN};
use crate::packet::{Packet, LAYER_DNS};
use crate::Result;
use flume::{bounded, Receiver, Sender};
use std::fmt;
use std::net::Ipv4Addr;

/// Assumed MTU when an interface does not report one.
pub const DEFAULT_MTU: usize = 1500;

/// Identifiers the socket layer dispatches inbound packets on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SocketProtocol {
    Icmp,
    Udp,
    Tcp,
    Dns,
}

impl fmt::Display for SocketProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketProtocol::Icmp => write!(f, "icmp"),
            SocketProtocol::Udp => write!(f, "udp"),
            SocketProtocol::Tcp => write!(f, "tcp"),
            SocketProtocol::Dns => write!(f, "dns"),
        }
    }
}

/// One network interface, as the stack describes it to its layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDesc {
    pub name: String,
    pub address: Ipv4Addr,
    pub mtu: usize,
}

impl InterfaceDesc {
    /// The loopback interface; handy as a stand-in where no real
    /// interface is around.
    pub fn loopback() -> Self {
        Self {
            name: "lo".to_string(),
            address: Ipv4Addr::LOCALHOST,
            mtu: DEFAULT_MTU,
        }
    }
}

/// The UDP collaborator below this layer.
pub trait UdpLayer {
    /// Crafts a packet with room for the lower-layer headers plus
    /// `total_size` bytes of UDP payload, addressed as given. The cursor
    /// of the returned packet sits at the first payload byte.
    fn allocate(
        &self,
        interface: &InterfaceDesc,
        destination: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
        total_size: usize,
    ) -> Result<Packet>;

    /// Completes the lower-layer framing (checksums, addressing) and sends
    /// the packet. The cursor points at the start of the UDP payload.
    fn finalize(&self, interface: &InterfaceDesc, packet: Packet) -> Result<()>;
}

/// The socket collaborator above this layer.
pub trait SocketLayer {
    /// One-way handoff of a consumed packet for downstream dispatch.
    /// `decoded` is `None` only when not even the header could be read.
    fn propagate(&self, packet: Packet, protocol: SocketProtocol, decoded: Option<DnsResponse>);
}

/// The DNS protocol layer.
///
/// Stateless between packets: it holds only its two collaborators, and
/// every call runs to completion on the caller's context with no locking
/// and nothing retained afterward.
pub struct DnsLayer<U, S> {
    udp: U,
    sockets: S,
}

impl<U: UdpLayer, S: SocketLayer> DnsLayer<U, S> {
    pub const fn new(udp: U, sockets: S) -> Self {
        Self { udp, sockets }
    }

    /// The UDP collaborator, for callers that drive it directly (e.g. to
    /// receive datagrams).
    pub const fn udp(&self) -> &U {
        &self.udp
    }

    /// Asks the UDP layer for a packet with `payload_size` bytes of room
    /// after the DNS header, stamps a standard-query header with
    /// `identification`, and returns the packet with the cursor just past
    /// the header so the caller can append the question section.
    pub fn prepare_query(
        &self,
        interface: &InterfaceDesc,
        destination: Ipv4Addr,
        source_port: u16,
        identification: u16,
        payload_size: usize,
    ) -> Result<Packet> {
        let mut packet = self.udp.allocate(
            interface,
            destination,
            source_port,
            DNS_PORT,
            HEADER_LEN + payload_size,
        )?;
        packet.tag(LAYER_DNS, packet.index());
        write_query_header(&mut packet, identification)?;
        Ok(packet)
    }

    /// Rewinds the cursor to the DNS header and gives the packet to the
    /// UDP layer for finalization. Checksums and addressing are entirely
    /// the UDP layer's business.
    pub fn finalize(&self, interface: &InterfaceDesc, mut packet: Packet) -> Result<()> {
        packet.rewind(HEADER_LEN)?;
        self.udp.finalize(interface, packet)
    }

    /// Decodes one inbound packet positioned at its DNS payload and hands
    /// it to the socket layer.
    ///
    /// There is a single exit: the packet always propagates, whether it
    /// was a response, a query, or carried a failure status. Malformed
    /// input is logged, never fatal.
    pub fn decode(&self, interface: &InterfaceDesc, mut packet: Packet) {
        trace!("dns: start DNS packet handling on {}", interface.name);
        packet.tag(LAYER_DNS, packet.index());

        let decoded = match DnsResponse::parse(&mut packet) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("dns: undecodable packet: {}", e);
                None
            }
        };

        self.sockets.propagate(packet, SocketProtocol::Dns, decoded);
    }
}

/// A socket layer that forwards decoded summaries over a channel.
///
/// The receiver half supports both `recv()` and `recv_async()`, so sync
/// and async consumers work alike. Delivery uses `try_send`: the decode
/// path never blocks, and a full or disconnected receiver loses the
/// summary with a logged warning.
pub struct ChannelSink {
    sender: Sender<DnsResponse>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<DnsResponse>) {
        let (sender, receiver) = bounded(100);
        (Self { sender }, receiver)
    }
}

impl SocketLayer for ChannelSink {
    fn propagate(&self, _packet: Packet, protocol: SocketProtocol, decoded: Option<DnsResponse>) {
        let response = match decoded {
            Some(response) => response,
            None => {
                trace!("{}: nothing decoded to deliver", protocol);
                return;
            }
        };
        if let Err(e) = self.sender.try_send(response) {
            warn!("{}: failed to deliver decoded packet: {}", protocol, e);
        }
    }
}
