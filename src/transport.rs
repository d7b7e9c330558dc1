//! A UDP collaborator running on the host's stack instead of inside one.
//!
//! The lower-layer headers exist only as reserved headroom here, so the
//! cursor/tag bookkeeping is identical to the in-stack case; the real
//! Ethernet/IP/UDP framing and checksums are the operating system's work.

#[cfg(feature = "logging")]
use crate::log::trace;
use crate::dns_layer::{InterfaceDesc, UdpLayer, DEFAULT_MTU};
use crate::packet::{Packet, LAYER_ETHERNET, LAYER_IP, LAYER_TRANSPORT};
use crate::{Error, Result};
use if_addrs::IfAddr;
use socket2::Socket;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

/// Size of an Ethernet header, kept as headroom.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Size of an IPv4 header without options.
pub const IPV4_HEADER_LEN: usize = 20;

/// Size of a UDP header.
pub const UDP_HEADER_LEN: usize = 8;

const HEADROOM: usize = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN;

/// Max UDP payload this transport accepts for one DNS message, per
/// [RFC 1035 section 2.3.4](https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.4).
const MAX_UDP_PAYLOAD: usize = 512;

/// Creates a new UDP socket bound to `addr`.
fn new_socket(addr: SocketAddr) -> Result<Socket> {
    let fd = Socket::new(socket2::Domain::IPV4, socket2::Type::DGRAM, None)
        .map_err(|e| e_fmt!("create socket failed: {}", e))?;

    fd.set_reuse_address(true)
        .map_err(|e| e_fmt!("set ReuseAddr failed: {}", e))?;

    fd.bind(&addr.into())
        .map_err(|e| e_fmt!("socket bind to {} failed: {}", &addr, e))?;

    trace!("new socket bind to {}", &addr);
    Ok(fd)
}

/// [UdpLayer] backed by one datagram socket on the host.
pub struct SystemUdp {
    socket: UdpSocket,
}

impl SystemUdp {
    /// Binds the transport's socket on `source_port`; 0 picks an
    /// ephemeral port.
    pub fn bind(source_port: u16) -> Result<Self> {
        let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, source_port);
        let socket = new_socket(SocketAddr::V4(addr))?;
        Ok(Self {
            socket: UdpSocket::from(socket),
        })
    }

    /// The port the socket actually bound.
    pub fn local_port(&self) -> Result<u16> {
        let addr = self
            .socket
            .local_addr()
            .map_err(|e| e_fmt!("local_addr failed: {}", e))?;
        Ok(addr.port())
    }

    /// Waits up to `timeout` for one inbound datagram and frames it with
    /// the same headroom and tags as an in-stack packet, cursor at the
    /// DNS payload, ready for decode.
    pub fn recv(&self, timeout: Duration) -> Result<Packet> {
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| e_fmt!("set_read_timeout failed: {}", e))?;

        let mut buf = vec![0u8; HEADROOM + MAX_UDP_PAYLOAD];
        let (len, from) = self
            .socket
            .recv_from(&mut buf[HEADROOM..])
            .map_err(|e| e_fmt!("recv failed: {}", e))?;
        buf.truncate(HEADROOM + len);
        trace!("received {} bytes from {}", len, from);

        let mut packet = Packet::new(buf);
        packet.tag(LAYER_ETHERNET, 0);
        packet.tag(LAYER_IP, ETHERNET_HEADER_LEN);
        packet.tag(LAYER_TRANSPORT, ETHERNET_HEADER_LEN + IPV4_HEADER_LEN);
        packet.advance(HEADROOM)?;
        Ok(packet)
    }
}

impl UdpLayer for SystemUdp {
    fn allocate(
        &self,
        interface: &InterfaceDesc,
        destination: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
        total_size: usize,
    ) -> Result<Packet> {
        trace!(
            "allocate {} payload bytes on {} from port {}",
            total_size,
            interface.name,
            source_port
        );
        // Remember the peer; finalize only sees the packet.
        self.socket
            .connect(SocketAddrV4::new(destination, destination_port))
            .map_err(|e| {
                Error::AllocationFailed(format!(
                    "connect to {}:{} failed: {}",
                    destination, destination_port, e
                ))
            })?;

        let mut packet = Packet::new(vec![0u8; HEADROOM + total_size]);
        packet.tag(LAYER_ETHERNET, 0);
        packet.tag(LAYER_IP, ETHERNET_HEADER_LEN);
        packet.tag(LAYER_TRANSPORT, ETHERNET_HEADER_LEN + IPV4_HEADER_LEN);
        packet.advance(HEADROOM)?;
        Ok(packet)
    }

    fn finalize(&self, _interface: &InterfaceDesc, packet: Packet) -> Result<()> {
        // The cursor sits at the DNS header; everything below it is the
        // operating system's framing work.
        let payload = &packet.as_slice()[packet.index()..];
        let sent = self
            .socket
            .send(payload)
            .map_err(|e| e_fmt!("send failed: {}", e))?;
        trace!("sent {} bytes", sent);
        Ok(())
    }
}

/// Lists the host's non-loopback IPv4 interfaces as stack descriptors.
pub fn ipv4_interfaces() -> Result<Vec<InterfaceDesc>> {
    let if_addrs =
        if_addrs::get_if_addrs().map_err(|e| e_fmt!("failed to get interfaces: {}", e))?;

    Ok(if_addrs
        .into_iter()
        .filter(|i| !i.is_loopback())
        .filter_map(|i| match i.addr {
            IfAddr::V4(ref v4) => Some(InterfaceDesc {
                name: i.name.clone(),
                address: v4.ip,
                mtu: DEFAULT_MTU,
            }),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recv_framing() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transport = SystemUdp::bind(0).unwrap();
        let port = transport.local_port().unwrap();

        server
            .send_to(&[0xAA, 0xBB, 0xCC], ("127.0.0.1", port))
            .unwrap();

        let packet = transport.recv(Duration::from_secs(5)).unwrap();
        assert_eq!(packet.index(), HEADROOM);
        assert_eq!(packet.remaining(), 3);
        assert_eq!(packet.layer_start(LAYER_TRANSPORT), 34);
        assert_eq!(&packet.as_slice()[HEADROOM..], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_allocate_headroom() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_port = match server.local_addr().unwrap() {
            SocketAddr::V4(v4) => v4.port(),
            _ => unreachable!(),
        };

        let transport = SystemUdp::bind(0).unwrap();
        let packet = transport
            .allocate(
                &InterfaceDesc::loopback(),
                Ipv4Addr::LOCALHOST,
                0,
                server_port,
                20,
            )
            .unwrap();
        assert_eq!(packet.index(), HEADROOM);
        assert_eq!(packet.remaining(), 20);
        assert_eq!(packet.layer_start(LAYER_IP), ETHERNET_HEADER_LEN);
    }
}
