//! DNS wire format: the fixed header, domain names, and the walk over a
//! response's question and answer sections.
//!
//! Everything here operates in place on a [Packet] borrowed from the lower
//! layers; nothing outlives the encode or decode call it belongs to.

#[cfg(feature = "logging")]
use crate::log::trace;
use crate::packet::{Packet, LAYER_DNS};
use crate::{Error, Result};
use std::{fmt, net::Ipv4Addr, str};

/// Well-known destination port for DNS over UDP.
pub const DNS_PORT: u16 = 53;

/// Size of the fixed DNS message header.
pub const HEADER_LEN: usize = 12;

/// Record type for an IPv4 host address.
pub const RR_TYPE_A: u16 = 1;

/// The class value for the Internet.
pub const CLASS_IN: u16 = 1;

/// Max length of one label on the wire, per
/// [RFC 1035 section 2.3.4](https://datatracker.ietf.org/doc/html/rfc1035#section-2.3.4).
pub const MAX_LABEL_LEN: usize = 63;

/// Max length of a whole encoded name, per RFC 1035 section 2.3.4.
pub const MAX_NAME_LEN: usize = 255;

/// Upper bound on compression pointers followed while decoding one name.
/// Chains longer than this are treated as hostile input.
pub const MAX_POINTER_HOPS: usize = 8;

/// Top two bits of a length byte that mark a compression pointer.
const POINTER_TAG: u8 = 0xC0;
const POINTER_OFFSET_MASK: u16 = 0x3FFF;

// Definitions for the DNS message header "flags" field.
//
// The field is 16-bit long, in this format:
// (RFC 1035 section 4.1.1)
//
//   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
// |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//
// Bit 0 is the most significant bit of the word, matching network bit
// order. The accessors below keep these positions exact.

/// The bit-packed flags word of the DNS header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeaderFlags(pub u16);

impl HeaderFlags {
    /// Query (false) or response (true).
    pub const fn qr(self) -> bool {
        (self.0 >> 15) & 0x1 == 1
    }

    /// Kind of query; 0 is a standard query.
    pub const fn opcode(self) -> u8 {
        ((self.0 >> 11) & 0xF) as u8
    }

    /// Authoritative answer.
    pub const fn aa(self) -> bool {
        (self.0 >> 10) & 0x1 == 1
    }

    /// Truncated message.
    pub const fn tc(self) -> bool {
        (self.0 >> 9) & 0x1 == 1
    }

    /// Recursion desired.
    pub const fn rd(self) -> bool {
        (self.0 >> 8) & 0x1 == 1
    }

    /// Recursion available.
    pub const fn ra(self) -> bool {
        (self.0 >> 7) & 0x1 == 1
    }

    /// Reserved bits, always zero on well-formed messages.
    pub const fn zeroes(self) -> u8 {
        ((self.0 >> 4) & 0x7) as u8
    }

    /// Raw response code nibble.
    pub const fn rcode(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    /// The status a response carries in its RCODE bits.
    pub const fn response_code(self) -> ResponseStatus {
        ResponseStatus::from_code(self.rcode())
    }

    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// Status carried by a response, decoded from the RCODE bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResponseStatus {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    /// A status this layer gives no meaning to. Logged and skipped,
    /// never rejected.
    Other(u8),
}

impl ResponseStatus {
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => ResponseStatus::NoError,
            1 => ResponseStatus::FormatError,
            2 => ResponseStatus::ServerFailure,
            3 => ResponseStatus::NameError,
            4 => ResponseStatus::NotImplemented,
            5 => ResponseStatus::Refused,
            other => ResponseStatus::Other(other),
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::NoError => write!(f, "OK"),
            ResponseStatus::FormatError => write!(f, "Format Error"),
            ResponseStatus::ServerFailure => write!(f, "Server Failure"),
            ResponseStatus::NameError => write!(f, "Name Error"),
            ResponseStatus::NotImplemented => write!(f, "Not Implemented"),
            ResponseStatus::Refused => write!(f, "Refused"),
            ResponseStatus::Other(code) => write!(f, "Unknown Status {}", code),
        }
    }
}

/// The fixed 12-byte DNS message header. All fields are big-endian on the
/// wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: HeaderFlags,
    pub questions: u16,
    pub answers: u16,
    pub authority_rrs: u16,
    pub additional_rrs: u16,
}

impl DnsHeader {
    /// Reads the header at the cursor and advances past it.
    pub fn read(packet: &mut Packet) -> Result<Self> {
        if packet.remaining() < HEADER_LEN {
            return Err(Error::Truncated(format!(
                "DNS header needs {} bytes, {} remain",
                HEADER_LEN,
                packet.remaining()
            )));
        }
        Ok(Self {
            id: packet.read_u16()?,
            flags: HeaderFlags(packet.read_u16()?),
            questions: packet.read_u16()?,
            answers: packet.read_u16()?,
            authority_rrs: packet.read_u16()?,
            additional_rrs: packet.read_u16()?,
        })
    }
}

/// Stamps the header of an outbound query at the cursor and advances past
/// it: the given identification, one question, no other records, and a
/// flags word with every bit zero (a pure standard query, no recursion).
///
/// The caller reserves the header room through the UDP allocation contract,
/// so the bounds checks here cannot fire on a well-behaved stack.
pub fn write_query_header(packet: &mut Packet, identification: u16) -> Result<()> {
    packet.write_u16(identification)?;
    packet.write_u16(0)?; // QR, OPCODE, AA, TC, RD, RA, Z, RCODE all zero
    packet.write_u16(1)?; // one question, nothing else
    packet.write_u16(0)?;
    packet.write_u16(0)?;
    packet.write_u16(0)?;
    Ok(())
}

/// Decodes a name in raw form at `offset`: length-prefixed labels up to a
/// zero terminator, dot-joined. Compression pointers are not accepted
/// here; any length byte above 63 fails.
///
/// Returns the name and the bytes consumed at `offset`.
pub fn decode_name(data: &[u8], offset: usize) -> Result<(String, usize)> {
    let mut pos = offset;
    let mut name = String::new();

    loop {
        let length = match data.get(pos) {
            Some(byte) => *byte as usize,
            None => {
                return Err(Error::Truncated(format!(
                    "name at offset {} has no terminator within {} bytes",
                    offset,
                    data.len()
                )))
            }
        };
        pos += 1;

        if length == 0 {
            break;
        }
        if length > MAX_LABEL_LEN {
            return Err(Error::MalformedName(format!(
                "label length 0x{:02x} at offset {}",
                length,
                pos - 1
            )));
        }

        let ending = pos + length;
        if ending > data.len() {
            return Err(Error::Truncated(format!(
                "label ends at {}, past the {}-byte buffer",
                ending,
                data.len()
            )));
        }
        if !name.is_empty() {
            name.push('.');
        }
        let label = str::from_utf8(&data[pos..ending])
            .map_err(|e| Error::MalformedName(format!("label at offset {}: {}", pos, e)))?;
        name.push_str(label);
        pos = ending;
    }

    Ok((name, pos - offset))
}

/// Decodes a name that may use message compression: labels and backward
/// pointers in any mix, per
/// [RFC 1035 section 4.1.4](https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4).
///
/// `message_start` is the buffer offset of the DNS header; pointer offsets
/// on the wire are relative to it. Every pointer must land strictly before
/// its own position, and at most [MAX_POINTER_HOPS] pointers are followed,
/// so hostile chains terminate.
///
/// Returns the name and the bytes consumed at `offset` (2 for a leading
/// pointer, however long the resolved name is).
pub fn decode_name_compressed(
    data: &[u8],
    message_start: usize,
    offset: usize,
) -> Result<(String, usize)> {
    let mut pos = offset;
    let mut name = String::new();
    let mut consumed = 0;
    let mut at_end = false;
    let mut hops = 0;

    loop {
        let length = match data.get(pos) {
            Some(byte) => *byte,
            None => {
                return Err(Error::Truncated(format!(
                    "name at offset {} runs past the {}-byte buffer",
                    offset,
                    data.len()
                )))
            }
        };

        if length == 0 {
            if !at_end {
                consumed = pos + 1 - offset;
            }
            break;
        }

        // The top two bits select between a label and a pointer.
        match length & POINTER_TAG {
            0x00 => {
                let start = pos + 1;
                let ending = start + length as usize;
                if ending > data.len() {
                    return Err(Error::Truncated(format!(
                        "label ends at {}, past the {}-byte buffer",
                        ending,
                        data.len()
                    )));
                }
                if !name.is_empty() {
                    name.push('.');
                }
                let label = str::from_utf8(&data[start..ending]).map_err(|e| {
                    Error::MalformedName(format!("label at offset {}: {}", start, e))
                })?;
                name.push_str(label);
                pos = ending;
            }
            0xC0 => {
                let slice = &data[pos..];
                if slice.len() < 2 {
                    return Err(Error::Truncated(format!(
                        "pointer at offset {} is cut short",
                        pos
                    )));
                }
                let pointer = u16::from_be_bytes([slice[0], slice[1]]) & POINTER_OFFSET_MASK;
                let target = message_start + pointer as usize;
                if target >= pos {
                    return Err(Error::CompressionLoop(format!(
                        "pointer at offset {} targets {} ahead of itself",
                        pos, target
                    )));
                }
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(Error::CompressionLoop(format!(
                        "more than {} pointers in one name",
                        MAX_POINTER_HOPS
                    )));
                }
                // A pointer ends the name's own wire footprint.
                if !at_end {
                    consumed = pos + 2 - offset;
                    at_end = true;
                }
                pos = target;
            }
            _ => {
                return Err(Error::MalformedName(format!(
                    "reserved label type 0x{:02x} at offset {}",
                    length, pos
                )));
            }
        }
    }

    Ok((name, consumed))
}

/// Encoded size of `name` on the wire: every label gets a length byte and
/// the whole name a zero terminator. One trailing dot is ignored.
pub fn name_wire_len(name: &str) -> usize {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() {
        1
    } else {
        name.len() + 2
    }
}

/// Encoded size of a question record for `name`.
pub fn question_wire_len(name: &str) -> usize {
    name_wire_len(name) + 4
}

/// Writes `name` at the cursor as length-prefixed labels plus the zero
/// terminator, and returns the bytes written. One trailing dot is ignored.
pub fn write_name(packet: &mut Packet, name: &str) -> Result<usize> {
    let total = name_wire_len(name);
    if total > MAX_NAME_LEN {
        return Err(Error::NameTooLong(total));
    }

    let name = name.strip_suffix('.').unwrap_or(name);
    for label in name.split('.') {
        if label.is_empty() {
            return Err(Error::MalformedName(format!("empty label in '{}'", name)));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong(format!(
                "label '{}' is {} bytes",
                label,
                label.len()
            )));
        }
        packet.write_u8(label.len() as u8)?;
        packet.write_bytes(label.as_bytes())?;
    }
    packet.write_u8(0)?;
    Ok(total)
}

/// Writes one question record into the reserved region at the cursor:
/// name, type, class.
///
/// The cursor is left where it started (just past the header after
/// `prepare_query`), which is where `finalize` expects it.
pub fn write_question(packet: &mut Packet, name: &str, rr_type: u16, class: u16) -> Result<()> {
    let name_len = write_name(packet, name)?;
    packet.write_u16(rr_type)?;
    packet.write_u16(class)?;
    packet.rewind(name_len + 4)?;
    Ok(())
}

/// One entry of the question section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String,
    pub rr_type: u16,
    pub class: u16,
}

/// One decoded answer record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DnsAnswer {
    /// An A/IN record, mapped to its IPv4 address.
    Address {
        name: String,
        address: Ipv4Addr,
        ttl: u32,
    },

    /// Any other type or class. The rdata is skipped, the record kept for
    /// accounting.
    Opaque {
        name: String,
        rr_type: u16,
        class: u16,
        ttl: u32,
    },
}

impl DnsAnswer {
    pub fn name(&self) -> &str {
        match self {
            DnsAnswer::Address { name, .. } => name,
            DnsAnswer::Opaque { name, .. } => name,
        }
    }

    pub const fn ttl(&self) -> u32 {
        match self {
            DnsAnswer::Address { ttl, .. } => *ttl,
            DnsAnswer::Opaque { ttl, .. } => *ttl,
        }
    }
}

/// Summary of one decoded inbound DNS packet.
///
/// Built by walking the packet once, in arrival order. A decode error in
/// the middle of a section stops the walk but keeps everything already
/// parsed; the error is carried in [error](DnsResponse::error) so the
/// summary still reaches the socket layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsResponse {
    pub id: u16,
    pub flags: HeaderFlags,
    pub status: ResponseStatus,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsAnswer>,
    pub error: Option<Error>,
}

impl DnsResponse {
    pub const fn is_query(&self) -> bool {
        !self.flags.qr()
    }

    pub const fn is_response(&self) -> bool {
        self.flags.qr()
    }

    /// Walks one packet positioned at its DNS header.
    ///
    /// Fails only if the 12 header bytes themselves are short; every later
    /// problem is recorded in the summary instead so partial results
    /// survive. Section parsing happens only for responses with status OK:
    /// every other status short-circuits right after the header, and
    /// authority/additional sections are never walked at all.
    pub fn parse(packet: &mut Packet) -> Result<Self> {
        let header = DnsHeader::read(packet)?;

        trace!("dns: identification {:#06x}", header.id);
        trace!("dns: questions {}", header.questions);
        trace!("dns: answers {}", header.answers);
        trace!("dns: authority RRs {}", header.authority_rrs);
        trace!("dns: additional RRs {}", header.additional_rrs);

        let mut response = Self {
            id: header.id,
            flags: header.flags,
            status: header.flags.response_code(),
            questions: Vec::new(),
            answers: Vec::new(),
            error: None,
        };

        if response.is_query() {
            trace!("dns: query");
            return Ok(response);
        }

        if response.status != ResponseStatus::NoError {
            trace!("dns: response {}", response.status);
            return Ok(response);
        }
        trace!("dns: response OK");

        if let Err(e) = response.read_sections(packet, header.questions, header.answers) {
            trace!("dns: section walk stopped: {}", e);
            response.error = Some(e);
        }
        Ok(response)
    }

    fn read_sections(&mut self, packet: &mut Packet, questions: u16, answers: u16) -> Result<()> {
        let message_start = packet.layer_start(LAYER_DNS);

        // Question names are echoed in full; no compression here.
        for i in 0..questions {
            let (name, used) = decode_name(packet.as_slice(), packet.index())?;
            packet.advance(used)?;
            let rr_type = packet.read_u16()?;
            let class = packet.read_u16()?;
            trace!(
                "dns: question {} type {} class {} name {}",
                i,
                rr_type,
                class,
                name
            );
            self.questions.push(DnsQuestion {
                name,
                rr_type,
                class,
            });
        }

        for i in 0..answers {
            // Answer names come back as pointers to the question; a
            // literal name here is an unsupported encoding.
            let leading = packet.peek_u8()?;
            if leading & POINTER_TAG != POINTER_TAG {
                return Err(Error::UnsupportedAnswerNameEncoding(packet.index()));
            }
            let (name, _) =
                decode_name_compressed(packet.as_slice(), message_start, packet.index())?;
            packet.advance(2)?; // a pointer's wire size, however long the name

            let rr_type = packet.read_u16()?;
            let class = packet.read_u16()?;
            let ttl = packet.read_u32()?;
            let rdata_len = packet.read_u16()? as usize;

            if packet.remaining() < rdata_len {
                return Err(Error::Truncated(format!(
                    "rdata length {} with {} bytes remaining",
                    rdata_len,
                    packet.remaining()
                )));
            }

            let answer = if rr_type == RR_TYPE_A && class == CLASS_IN {
                if rdata_len < 4 {
                    return Err(Error::Truncated(format!(
                        "A record rdata is only {} bytes",
                        rdata_len
                    )));
                }
                let rdata = &packet.as_slice()[packet.index()..packet.index() + 4];
                let address = Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]);
                trace!(
                    "dns: answer {} domain {} type {} class {} ttl {} ip {}",
                    i,
                    name,
                    rr_type,
                    class,
                    ttl,
                    address
                );
                DnsAnswer::Address { name, address, ttl }
            } else {
                trace!(
                    "dns: answer {} domain {} type {} class {} ttl {}, rdata skipped",
                    i,
                    name,
                    rr_type,
                    class,
                    ttl
                );
                DnsAnswer::Opaque {
                    name,
                    rr_type,
                    class,
                    ttl,
                }
            };

            // Framing never depends on whether the rdata was interpreted.
            packet.advance(rdata_len)?;
            self.answers.push(answer);
        }

        // Authority and additional records are counted in the header but
        // never consumed; the packet is discarded after this call anyway.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Packet, LAYER_DNS};

    fn dns_packet(data: Vec<u8>) -> Packet {
        let mut packet = Packet::new(data);
        packet.tag(LAYER_DNS, 0);
        packet
    }

    /// Reference response from a query for `example.com`: id 0x1234,
    /// flags 0x8180, one question, one answer via a pointer to the
    /// question's name, A/IN, ttl 300, rdata 93.184.216.34.
    fn example_response() -> Vec<u8> {
        let mut data = vec![
            0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ];
        data.extend_from_slice(b"\x07example\x03com\x00");
        data.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        // answer: pointer to offset 12, type A, class IN, ttl 300, 4 rdata bytes
        data.extend_from_slice(&[0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01]);
        data.extend_from_slice(&300u32.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x04, 93, 184, 216, 34]);
        data
    }

    #[test]
    fn test_flags_bit_positions() {
        let flags = HeaderFlags(0x8180); // QR=1, RD=1, RA=1, everything else 0
        assert!(flags.qr());
        assert_eq!(flags.opcode(), 0);
        assert!(!flags.aa());
        assert!(!flags.tc());
        assert!(flags.rd());
        assert!(flags.ra());
        assert_eq!(flags.zeroes(), 0);
        assert_eq!(flags.rcode(), 0);

        let flags = HeaderFlags(0x8403); // QR=1, AA=1, RCODE=3
        assert!(flags.aa());
        assert!(!flags.rd());
        assert_eq!(flags.rcode(), 3);
        assert_eq!(flags.response_code(), ResponseStatus::NameError);
    }

    #[test]
    fn test_query_header_round_trip() {
        for &id in &[0u16, 1, 0x1234, 0xFFFF] {
            let mut packet = dns_packet(vec![0u8; HEADER_LEN]);
            write_query_header(&mut packet, id).unwrap();
            assert_eq!(packet.index(), HEADER_LEN);

            packet.rewind(HEADER_LEN).unwrap();
            let header = DnsHeader::read(&mut packet).unwrap();
            assert_eq!(header.id, id);
            assert!(!header.flags.qr());
            assert_eq!(header.flags.opcode(), 0);
            assert_eq!(header.flags.bits(), 0);
            assert_eq!(header.questions, 1);
            assert_eq!(header.answers, 0);
            assert_eq!(header.authority_rrs, 0);
            assert_eq!(header.additional_rrs, 0);
        }
    }

    #[test]
    fn test_header_truncated() {
        for len in 0..HEADER_LEN {
            let mut packet = dns_packet(vec![0u8; len]);
            assert!(matches!(
                DnsHeader::read(&mut packet),
                Err(Error::Truncated(_))
            ));
        }
    }

    #[test]
    fn test_name_round_trip() {
        let max_labels = format!("{}.{}", "x".repeat(63), "y".repeat(63));
        let names = [
            "a",
            "example.com",
            "sub.domain.example.com",
            "a.b.c.d.e.f.g.h.i.j",
            max_labels.as_str(),
        ];
        for name in &names {
            let mut packet = dns_packet(vec![0u8; 256]);
            let written = write_name(&mut packet, name).unwrap();
            assert_eq!(written, name_wire_len(name));

            let (decoded, used) = decode_name(packet.as_slice(), 0).unwrap();
            assert_eq!(&decoded, name);
            assert_eq!(used, written);
        }
    }

    #[test]
    fn test_name_trailing_dot_ignored() {
        let mut packet = dns_packet(vec![0u8; 32]);
        write_name(&mut packet, "example.com.").unwrap();
        let (decoded, _) = decode_name(packet.as_slice(), 0).unwrap();
        assert_eq!(decoded, "example.com");
    }

    #[test]
    fn test_encode_name_limits() {
        let mut packet = dns_packet(vec![0u8; 512]);
        let e = write_name(&mut packet, &"x".repeat(64)).unwrap_err();
        assert!(matches!(e, Error::LabelTooLong(_)));

        let long: Vec<String> = (0..32).map(|i| format!("label-{:02}", i)).collect();
        let e = write_name(&mut packet, &long.join(".")).unwrap_err();
        assert!(matches!(e, Error::NameTooLong(_)));

        let e = write_name(&mut packet, "a..b").unwrap_err();
        assert!(matches!(e, Error::MalformedName(_)));
    }

    #[test]
    fn test_decode_name_rejects_big_label() {
        // raw form: no pointers, no lengths above 63
        let data = vec![0x40, b'a', 0x00];
        assert!(matches!(
            decode_name(&data, 0),
            Err(Error::MalformedName(_))
        ));
        let data = vec![0xC0, 0x0C];
        assert!(matches!(
            decode_name(&data, 0),
            Err(Error::MalformedName(_))
        ));
    }

    #[test]
    fn test_decode_name_unterminated() {
        let mut data = Vec::new();
        data.extend_from_slice(b"\x07example\x03com"); // no zero byte
        assert!(matches!(decode_name(&data, 0), Err(Error::Truncated(_))));

        // label runs past the end
        assert!(matches!(decode_name(b"\x05ab", 0), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_compression_resolves_to_prior_name() {
        // name at offset 12, pointer 0xC00C at offset 40
        let mut data = vec![0u8; 64];
        data[12..25].copy_from_slice(b"\x07example\x03com\x00");
        data[40] = 0xC0;
        data[41] = 0x0C;

        let (direct, _) = decode_name_compressed(&data, 0, 12).unwrap();
        let (via_pointer, used) = decode_name_compressed(&data, 0, 40).unwrap();
        assert_eq!(direct, "example.com");
        assert_eq!(via_pointer, direct);
        assert_eq!(used, 2);
    }

    #[test]
    fn test_compression_relative_to_message_start() {
        // the DNS message starts at offset 5 of the shared frame buffer
        let mut data = vec![0u8; 64];
        data[17..30].copy_from_slice(b"\x07example\x03com\x00");
        data[45] = 0xC0;
        data[46] = 0x0C; // offset 12 from the message start, 17 absolute

        let (name, used) = decode_name_compressed(&data, 5, 45).unwrap();
        assert_eq!(name, "example.com");
        assert_eq!(used, 2);
    }

    #[test]
    fn test_compression_labels_then_pointer() {
        let mut data = vec![0u8; 64];
        data[12..25].copy_from_slice(b"\x07example\x03com\x00");
        // "www" + pointer back to "example.com"
        data[30..36].copy_from_slice(b"\x03www\xC0\x0C");

        let (name, used) = decode_name_compressed(&data, 0, 30).unwrap();
        assert_eq!(name, "www.example.com");
        assert_eq!(used, 6);
    }

    #[test]
    fn test_compression_self_pointer() {
        let mut data = vec![0u8; 32];
        data[12] = 0xC0;
        data[13] = 0x0C; // points at itself
        assert!(matches!(
            decode_name_compressed(&data, 0, 12),
            Err(Error::CompressionLoop(_))
        ));
    }

    #[test]
    fn test_compression_cycle_hits_hop_limit() {
        // a label whose trailing pointer targets the label itself: every
        // hop passes the backward check, so only the hop counter ends this
        let mut data = vec![0u8; 64];
        data[12..15].copy_from_slice(b"\x02de");
        data[15] = 0xC0;
        data[16] = 0x0C; // back to offset 12
        data[40] = 0xC0;
        data[41] = 0x0C;

        assert!(matches!(
            decode_name_compressed(&data, 0, 40),
            Err(Error::CompressionLoop(_))
        ));
    }

    #[test]
    fn test_compression_forward_pointer() {
        let mut data = vec![0u8; 64];
        data[12] = 0xC0;
        data[13] = 0x28; // targets offset 40, ahead of the pointer
        assert!(matches!(
            decode_name_compressed(&data, 0, 12),
            Err(Error::CompressionLoop(_))
        ));
    }

    #[test]
    fn test_compression_reserved_bits() {
        for tag in &[0x40u8, 0x80] {
            let data = vec![*tag, b'a', 0x00];
            assert!(matches!(
                decode_name_compressed(&data, 0, 0),
                Err(Error::MalformedName(_))
            ));
        }
    }

    #[test]
    fn test_write_question_bytes() {
        let name = "example.com";
        let mut packet = dns_packet(vec![0u8; question_wire_len(name)]);
        write_question(&mut packet, name, RR_TYPE_A, CLASS_IN).unwrap();
        assert_eq!(
            packet.as_slice(),
            b"\x07example\x03com\x00\x00\x01\x00\x01"
        );
        // the record fills the reserved region, the cursor stays put
        assert_eq!(packet.index(), 0);
    }

    #[test]
    fn test_parse_resolved_answer() {
        let mut packet = dns_packet(example_response());
        let response = DnsResponse::parse(&mut packet).unwrap();

        assert_eq!(response.id, 0x1234);
        assert!(response.is_response());
        assert_eq!(response.status, ResponseStatus::NoError);
        assert!(response.error.is_none());
        assert_eq!(
            response.questions,
            vec![DnsQuestion {
                name: "example.com".to_string(),
                rr_type: RR_TYPE_A,
                class: CLASS_IN,
            }]
        );
        assert_eq!(
            response.answers,
            vec![DnsAnswer::Address {
                name: "example.com".to_string(),
                address: Ipv4Addr::new(93, 184, 216, 34),
                ttl: 300,
            }]
        );
    }

    #[test]
    fn test_parse_name_error_skips_sections() {
        let mut data = example_response();
        data[3] = 0x83; // RCODE = 3
        let mut packet = dns_packet(data);
        let response = DnsResponse::parse(&mut packet).unwrap();

        assert_eq!(response.status, ResponseStatus::NameError);
        assert!(response.questions.is_empty());
        assert!(response.answers.is_empty());
        // the walk never started, the cursor sits right after the header
        assert_eq!(packet.index(), HEADER_LEN);
    }

    #[test]
    fn test_parse_unknown_status_is_not_an_error() {
        let mut data = example_response();
        data[3] = 0x8B; // RCODE = 11, unassigned
        let mut packet = dns_packet(data);
        let response = DnsResponse::parse(&mut packet).unwrap();
        assert_eq!(response.status, ResponseStatus::Other(11));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_parse_query_skips_sections() {
        let mut data = example_response();
        data[2] = 0x01; // QR=0, RD=1
        data[3] = 0x00;
        let mut packet = dns_packet(data);
        let response = DnsResponse::parse(&mut packet).unwrap();
        assert!(response.is_query());
        assert!(response.questions.is_empty());
        assert!(response.answers.is_empty());
    }

    #[test]
    fn test_parse_opaque_answer() {
        let mut data = example_response();
        data[32] = 0x10; // answer type 16 (TXT), rdata left as-is
        let mut packet = dns_packet(data);
        let response = DnsResponse::parse(&mut packet).unwrap();

        assert!(response.error.is_none());
        assert_eq!(
            response.answers,
            vec![DnsAnswer::Opaque {
                name: "example.com".to_string(),
                rr_type: 16,
                class: CLASS_IN,
                ttl: 300,
            }]
        );
        // the skipped rdata was still consumed
        assert_eq!(packet.remaining(), 0);
    }

    #[test]
    fn test_parse_literal_answer_name_unsupported() {
        // two answers: the first compressed, the second a literal name
        let mut data = example_response();
        data[7] = 2; // answers = 2
        let second_name_at = data.len();
        data.extend_from_slice(b"\x07example\x03com\x00");
        data.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        data.extend_from_slice(&300u32.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x04, 93, 184, 216, 34]);

        let mut packet = dns_packet(data);
        let response = DnsResponse::parse(&mut packet).unwrap();

        assert_eq!(
            response.error,
            Some(Error::UnsupportedAnswerNameEncoding(second_name_at))
        );
        // the first answer survived the abort
        assert_eq!(response.answers.len(), 1);
        assert_eq!(
            response.answers[0],
            DnsAnswer::Address {
                name: "example.com".to_string(),
                address: Ipv4Addr::new(93, 184, 216, 34),
                ttl: 300,
            }
        );
    }

    #[test]
    fn test_parse_rdata_overrun_keeps_prior_answers() {
        let mut data = example_response();
        data[7] = 2; // answers = 2
        data.extend_from_slice(&[0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01]);
        data.extend_from_slice(&300u32.to_be_bytes());
        data.extend_from_slice(&[0x40, 0x00]); // rdata length far past the end

        let mut packet = dns_packet(data);
        let response = DnsResponse::parse(&mut packet).unwrap();

        assert!(matches!(response.error, Some(Error::Truncated(_))));
        assert_eq!(response.answers.len(), 1);
    }

    #[test]
    fn test_parse_truncated_question() {
        let data = vec![
            0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, b'e',
        ];
        let mut packet = dns_packet(data);
        let response = DnsResponse::parse(&mut packet).unwrap();
        assert!(matches!(response.error, Some(Error::Truncated(_))));
        assert!(response.questions.is_empty());
    }
}
