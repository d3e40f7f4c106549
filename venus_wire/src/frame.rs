//! Transport frame header.
//!
//! Every message on the wire -- request or reply -- is a fixed 12-byte
//! header followed by `payload_size` bytes of encoded command body. The
//! magic lets either end detect a desynchronised stream (wrong protocol,
//! stale client) before trusting `payload_size` as an allocation request.

use byteorder::{ByteOrder, LittleEndian};

use crate::VenusWireError;

pub const FRAME_MAGIC: u32 = 0x56504C53; // "VPLS"
pub const FRAME_HEADER_LEN: usize = 12;

/// Caps a single frame's payload so a corrupted or malicious length field
/// can't drive an unbounded allocation in `read_frame`.
pub const MAX_FRAME_PAYLOAD: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u32,
    pub payload_size: u32,
    pub sequence: u32,
}

impl FrameHeader {
    pub fn new(payload_size: u32, sequence: u32) -> Self {
        Self {
            magic: FRAME_MAGIC,
            payload_size,
            sequence,
        }
    }

    pub fn encode(&self, out: &mut [u8; FRAME_HEADER_LEN]) {
        LittleEndian::write_u32(&mut out[0..4], self.magic);
        LittleEndian::write_u32(&mut out[4..8], self.payload_size);
        LittleEndian::write_u32(&mut out[8..12], self.sequence);
    }

    pub fn decode(bytes: &[u8; FRAME_HEADER_LEN]) -> Result<Self, VenusWireError> {
        let magic = LittleEndian::read_u32(&bytes[0..4]);
        if magic != FRAME_MAGIC {
            return Err(VenusWireError::BadMagic(magic));
        }
        let payload_size = LittleEndian::read_u32(&bytes[4..8]);
        if payload_size > MAX_FRAME_PAYLOAD {
            return Err(VenusWireError::FrameTooLarge(payload_size));
        }
        let sequence = LittleEndian::read_u32(&bytes[8..12]);
        Ok(Self {
            magic,
            payload_size,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = FrameHeader::new(128, 7);
        let mut bytes = [0u8; FRAME_HEADER_LEN];
        header.encode(&mut bytes);
        let decoded = FrameHeader::decode(&bytes).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = [0u8; FRAME_HEADER_LEN];
        assert!(matches!(
            FrameHeader::decode(&bytes),
            Err(VenusWireError::BadMagic(0))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let header = FrameHeader::new(MAX_FRAME_PAYLOAD + 1, 0);
        let mut bytes = [0u8; FRAME_HEADER_LEN];
        header.encode(&mut bytes);
        assert!(matches!(
            FrameHeader::decode(&bytes),
            Err(VenusWireError::FrameTooLarge(_))
        ));
    }
}
