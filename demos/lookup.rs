//! One-shot A record lookup from the command line.
//!
//! Run with: cargo run --example lookup -- example.com [server]
//!
//! The server defaults to 1.1.1.1. Turn on `RUST_LOG=trace` to watch the
//! layer walk the response.

use netstack_dns::{
    ipv4_interfaces, question_wire_len, write_question, ChannelSink, DnsAnswer, DnsLayer,
    InterfaceDesc, ResponseStatus, SystemUdp, CLASS_IN, RR_TYPE_A,
};
use std::net::Ipv4Addr;
use std::time::Duration;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let name = match args.next() {
        Some(name) => name,
        None => {
            eprintln!("Usage: lookup <name> [server]");
            std::process::exit(1);
        }
    };
    let server: Ipv4Addr = args
        .next()
        .unwrap_or_else(|| "1.1.1.1".to_string())
        .parse()
        .expect("server must be an IPv4 address");

    let interface = ipv4_interfaces()
        .ok()
        .and_then(|mut list| list.pop())
        .unwrap_or_else(InterfaceDesc::loopback);

    let udp = SystemUdp::bind(0).expect("failed to bind a socket");
    let source_port = udp.local_port().expect("no local port");
    let (sink, decoded) = ChannelSink::new();
    let dns = DnsLayer::new(udp, sink);

    let id = fastrand::u16(..);
    let mut packet = dns
        .prepare_query(&interface, server, source_port, id, question_wire_len(&name))
        .expect("failed to prepare the query");
    write_question(&mut packet, &name, RR_TYPE_A, CLASS_IN).expect("failed to write the question");
    dns.finalize(&interface, packet).expect("failed to send");

    let reply = dns
        .udp()
        .recv(Duration::from_secs(3))
        .expect("no response from the server");
    dns.decode(&interface, reply);

    let response = decoded.recv().expect("nothing decoded");
    if response.status != ResponseStatus::NoError {
        eprintln!("{}: {}", name, response.status);
        std::process::exit(1);
    }
    for answer in &response.answers {
        match answer {
            DnsAnswer::Address { address, ttl, .. } => {
                println!("{} has address {} (ttl {}s)", answer.name(), address, ttl);
            }
            DnsAnswer::Opaque { rr_type, .. } => {
                println!("{}: record type {} skipped", answer.name(), rr_type);
            }
        }
    }
    if let Some(e) = response.error {
        eprintln!("response only partially decoded: {}", e);
    }
}
