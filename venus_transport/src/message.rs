//! Framed message send/receive on top of [`crate::io`].

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};

use venus_wire::frame::{FrameHeader, FRAME_HEADER_LEN};
use venus_wire::VenusWireError;

use crate::io::{read_exact_or_eof, write_all_flush};
use crate::TransportError;

/// Hands out the monotonically increasing sequence numbers stamped into
/// each frame header, used by a peer to detect reordering or drops.
#[derive(Default)]
pub struct SequenceCounter(AtomicU32);

impl SequenceCounter {
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn send_frame<W: Write>(writer: &mut W, sequence: &SequenceCounter, payload: &[u8]) -> Result<(), TransportError> {
    let header = FrameHeader::new(payload.len() as u32, sequence.next());
    let mut header_bytes = [0u8; FRAME_HEADER_LEN];
    header.encode(&mut header_bytes);
    write_all_flush(writer, &header_bytes)?;
    write_all_flush(writer, payload)?;
    Ok(())
}

/// Reads one frame, or `Ok(None)` if the peer closed the connection cleanly
/// between frames.
pub fn receive_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError> {
    let mut header_bytes = [0u8; FRAME_HEADER_LEN];
    if !read_exact_or_eof(reader, &mut header_bytes)? {
        return Ok(None);
    }
    let header = FrameHeader::decode(&header_bytes).map_err(TransportError::Wire)?;
    let mut payload = vec![0u8; header.payload_size as usize];
    if !read_exact_or_eof(reader, &mut payload)? {
        return Err(TransportError::Wire(VenusWireError::DecodeFatal));
    }
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frame_round_trips_through_a_buffer() {
        let sequence = SequenceCounter::new();
        let mut buf = Vec::new();
        send_frame(&mut buf, &sequence, b"hello").unwrap();
        send_frame(&mut buf, &sequence, b"world").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(receive_frame(&mut cursor).unwrap().unwrap(), b"hello");
        assert_eq!(receive_frame(&mut cursor).unwrap().unwrap(), b"world");
        assert!(receive_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn empty_payload_is_a_valid_frame() {
        let sequence = SequenceCounter::new();
        let mut buf = Vec::new();
        send_frame(&mut buf, &sequence, &[]).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(receive_frame(&mut cursor).unwrap().unwrap(), Vec::<u8>::new());
    }
}
