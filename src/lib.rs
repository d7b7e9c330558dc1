//! The DNS protocol layer of a layered network stack.
//!
//! This library encodes outbound DNS queries and decodes inbound responses
//! in place, over packet buffers shared with the layers below: no
//! per-layer copying, one cursor and a tag per layer to find each header
//! region. The layers around it are collaborators behind traits: a
//! [UdpLayer] below that allocates and finalizes packets, and a
//! [SocketLayer] above that receives every decoded packet.
//!
//! An outbound query flows like this:
//!```text
//!  caller                    DNS layer                  UDP layer
//!    |    -- prepare_query -->  |    -- allocate -->       |
//!    |                          | stamps the header        |
//!    |   <-- packet, cursor after header                   |
//!    | writes the question      |                          |
//!    |    -- finalize ------->  | rewinds to its header    |
//!    |                          |    -- finalize -->       | checksums, send
//!```
//! Inbound, [DnsLayer::decode] walks the response sections, resolves
//! name-compression pointers, maps A/IN answers to IPv4 addresses and
//! propagates the summary to the socket layer. Decoding is synchronous and
//! per packet; nothing is retained across calls.
//!
//! # Usage
//!
//! [SystemUdp] is a ready-made UDP collaborator on the host's stack, and
//! [ChannelSink] a socket layer that delivers summaries over a channel
//! (supporting both `recv()` and `recv_async()`):
//!
//! ```rust,no_run
//! use netstack_dns::{
//!     question_wire_len, write_question, ChannelSink, DnsLayer, InterfaceDesc, SystemUdp,
//!     CLASS_IN, RR_TYPE_A,
//! };
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! let udp = SystemUdp::bind(0).expect("failed to bind a socket");
//! let (sink, decoded) = ChannelSink::new();
//! let dns = DnsLayer::new(udp, sink);
//!
//! let interface = InterfaceDesc::loopback();
//! let server = Ipv4Addr::new(192, 0, 2, 53);
//! let name = "example.com";
//!
//! let mut packet = dns
//!     .prepare_query(&interface, server, 0, 0x1234, question_wire_len(name))
//!     .expect("failed to prepare a query");
//! write_question(&mut packet, name, RR_TYPE_A, CLASS_IN).expect("failed to write the question");
//! dns.finalize(&interface, packet).expect("failed to send");
//!
//! let reply = dns.udp().recv(Duration::from_secs(3)).expect("no response");
//! dns.decode(&interface, reply);
//! println!("{:?}", decoded.recv().unwrap());
//! ```

// log for logging (optional).
#[cfg(feature = "logging")]
pub(crate) use log;

#[cfg(not(feature = "logging"))]
#[macro_use]
pub(crate) mod log {
    macro_rules! trace {
        ($($arg:expr),* $(,)?) => {
            {
                let _ = ($(&$arg),*); // avoid warnings about unused variables.
            }
        };
    }
    macro_rules! warn {
        ($($arg:expr),* $(,)?) => {
            {
                let _ = ($(&$arg),*);
            }
        };
    }
}

/// A simple macro to report all kinds of errors.
macro_rules! e_fmt {
    ($($arg:tt)+) => {
        $crate::Error::Msg(format!($($arg)+))
    };
}

mod dns_layer;
mod dns_wire;
mod error;
mod packet;
mod transport;

pub use dns_layer::{
    ChannelSink, DnsLayer, InterfaceDesc, SocketLayer, SocketProtocol, UdpLayer, DEFAULT_MTU,
};
pub use dns_wire::{
    decode_name, decode_name_compressed, name_wire_len, question_wire_len, write_name,
    write_query_header, write_question, DnsAnswer, DnsHeader, DnsQuestion, DnsResponse,
    HeaderFlags, ResponseStatus, CLASS_IN, DNS_PORT, HEADER_LEN, MAX_LABEL_LEN, MAX_NAME_LEN,
    MAX_POINTER_HOPS, RR_TYPE_A,
};
pub use error::{Error, Result};
pub use packet::{Packet, LAYER_DNS, LAYER_ETHERNET, LAYER_IP, LAYER_TRANSPORT};
pub use transport::{
    ipv4_interfaces, SystemUdp, ETHERNET_HEADER_LEN, IPV4_HEADER_LEN, UDP_HEADER_LEN,
};

/// Re-export from `flume`.
pub use flume::Receiver;
