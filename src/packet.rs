//! The packet buffer shared between protocol layers.
//!
//! One [Packet] holds the whole frame. The lower layers allocate it with
//! room for their headers, and each layer records where its own region
//! starts with [Packet::tag] instead of copying the payload upward. All
//! reads and writes go through the cursor and are bounds checked, and every
//! multi-byte access converts between host and network byte order.

use crate::{Error, Result};

/// Layer id for the Ethernet header, used with [Packet::tag].
pub const LAYER_ETHERNET: usize = 0;

/// Layer id for the IP header.
pub const LAYER_IP: usize = 1;

/// Layer id for the transport (UDP) header.
pub const LAYER_TRANSPORT: usize = 2;

/// Layer id for the DNS message.
pub const LAYER_DNS: usize = 3;

const LAYER_COUNT: usize = 4;

/// A frame buffer with a cursor and per-layer start offsets.
///
/// The cursor is the single read/write position; layers move it forward
/// with [advance](Packet::advance) as they consume or produce bytes, and a
/// layer handing a packet back down rewinds it to its own header first.
/// Tag offsets are always relative to the start of the buffer, never to
/// the current cursor.
#[derive(Clone, Debug)]
pub struct Packet {
    data: Vec<u8>,
    index: usize,
    tags: [usize; LAYER_COUNT],
}

impl Packet {
    /// Wraps a frame buffer with the cursor at the first byte.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            index: 0,
            tags: [0; LAYER_COUNT],
        }
    }

    /// Records where `layer`'s region begins within the buffer.
    pub fn tag(&mut self, layer: usize, offset: usize) {
        assert!(layer < LAYER_COUNT);
        self.tags[layer] = offset;
    }

    /// Returns the recorded start offset of `layer`.
    pub fn layer_start(&self, layer: usize) -> usize {
        assert!(layer < LAYER_COUNT);
        self.tags[layer]
    }

    /// Current cursor position, relative to the buffer start.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Total buffer length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// The whole frame, lower-layer regions included.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the packet and returns the underlying buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Moves the cursor forward by `n` bytes.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        let end = self.index + n;
        if end > self.data.len() {
            return Err(Error::OutOfBounds(format!(
                "advance of {} bytes at index {} in a {}-byte buffer",
                n,
                self.index,
                self.data.len()
            )));
        }
        self.index = end;
        Ok(())
    }

    /// Moves the cursor backward by `n` bytes.
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        if n > self.index {
            return Err(Error::OutOfBounds(format!(
                "rewind of {} bytes at index {}",
                n, self.index
            )));
        }
        self.index -= n;
        Ok(())
    }

    /// Reads the byte at the cursor without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        match self.data.get(self.index) {
            Some(byte) => Ok(*byte),
            None => Err(Error::Truncated(format!(
                "peek at index {} in a {}-byte buffer",
                self.index,
                self.data.len()
            ))),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.index += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let slice = &self.data[self.index..];
        if slice.len() < 2 {
            return Err(Error::Truncated(format!(
                "read_u16: only {} bytes remain",
                slice.len()
            )));
        }
        let num = u16::from_be_bytes([slice[0], slice[1]]);
        self.index += 2;
        Ok(num)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let slice = &self.data[self.index..];
        if slice.len() < 4 {
            return Err(Error::Truncated(format!(
                "read_u32: only {} bytes remain",
                slice.len()
            )));
        }
        let num = u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]);
        self.index += 4;
        Ok(num)
    }

    pub fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    pub fn write_u16(&mut self, short: u16) -> Result<()> {
        self.write_bytes(&short.to_be_bytes())
    }

    pub fn write_u32(&mut self, int: u32) -> Result<()> {
        self.write_bytes(&int.to_be_bytes())
    }

    /// Copies `bytes` into the buffer at the cursor and advances past them.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.index + bytes.len();
        if end > self.data.len() {
            return Err(Error::OutOfBounds(format!(
                "write of {} bytes at index {} in a {}-byte buffer",
                bytes.len(),
                self.index,
                self.data.len()
            )));
        }
        self.data[self.index..end].copy_from_slice(bytes);
        self.index = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_is_big_endian() {
        let mut packet = Packet::new(vec![0u8; 6]);
        packet.write_u16(0x1234).unwrap();
        packet.write_u32(0x5DB8_D822).unwrap();
        assert_eq!(packet.as_slice(), &[0x12, 0x34, 0x5D, 0xB8, 0xD8, 0x22]);

        packet.rewind(6).unwrap();
        assert_eq!(packet.read_u16().unwrap(), 0x1234);
        assert_eq!(packet.read_u32().unwrap(), 0x5DB8_D822);
    }

    #[test]
    fn test_advance_past_end() {
        let mut packet = Packet::new(vec![0u8; 4]);
        packet.advance(3).unwrap();

        let e = packet.advance(2).unwrap_err();
        assert!(matches!(e, Error::OutOfBounds(_)));
        // a failed advance must not move the cursor
        assert_eq!(packet.index(), 3);

        packet.advance(1).unwrap();
        assert_eq!(packet.remaining(), 0);
    }

    #[test]
    fn test_rewind_past_start() {
        let mut packet = Packet::new(vec![0u8; 4]);
        packet.advance(2).unwrap();
        assert!(matches!(packet.rewind(3), Err(Error::OutOfBounds(_))));
        packet.rewind(2).unwrap();
        assert_eq!(packet.index(), 0);
    }

    #[test]
    fn test_short_reads_fail() {
        let mut packet = Packet::new(vec![0xAB]);
        assert_eq!(packet.peek_u8().unwrap(), 0xAB);
        assert!(matches!(packet.read_u16(), Err(Error::Truncated(_))));
        assert!(matches!(packet.read_u32(), Err(Error::Truncated(_))));
        // failed reads leave the cursor in place
        assert_eq!(packet.read_u8().unwrap(), 0xAB);
        assert!(matches!(packet.read_u8(), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_write_past_end() {
        let mut packet = Packet::new(vec![0u8; 3]);
        packet.write_u16(0xFFEE).unwrap();
        assert!(matches!(packet.write_u16(0x0102), Err(Error::OutOfBounds(_))));
        assert_eq!(packet.index(), 2);
    }

    #[test]
    fn test_layer_tags() {
        let mut packet = Packet::new(vec![0u8; 64]);
        packet.tag(LAYER_ETHERNET, 0);
        packet.tag(LAYER_IP, 14);
        packet.tag(LAYER_TRANSPORT, 34);
        packet.tag(LAYER_DNS, 42);
        assert_eq!(packet.layer_start(LAYER_DNS), 42);
        assert_eq!(packet.layer_start(LAYER_TRANSPORT), 34);
        // tags never move with the cursor
        packet.advance(50).unwrap();
        assert_eq!(packet.layer_start(LAYER_DNS), 42);
    }
}
