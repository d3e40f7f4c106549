//! Scalar, array, string and blob primitives shared by every hand-written
//! command codec in [`crate::commands`].
//!
//! Every Vulkan scalar width gets its own pair of free functions rather than
//! a generic `Encode`/`Decode` trait: the wire format is fixed-width and
//! little-endian by construction, so a trait would only hide the width at
//! the call site without buying genericity the codec actually needs.

use byteorder::{ByteOrder, LittleEndian};

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;

pub fn encode_u8(enc: &mut Encoder, value: u8) {
    enc.write_bytes(1, &[value]);
}

pub fn decode_u8(dec: &mut Decoder) -> u8 {
    let mut buf = [0u8; 1];
    dec.read_bytes(1, &mut buf);
    buf[0]
}

pub fn encode_u32(enc: &mut Encoder, value: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    enc.write_bytes(4, &buf);
}

pub fn decode_u32(dec: &mut Decoder) -> u32 {
    let mut buf = [0u8; 4];
    dec.read_bytes(4, &mut buf);
    LittleEndian::read_u32(&buf)
}

pub fn encode_i32(enc: &mut Encoder, value: i32) {
    encode_u32(enc, value as u32);
}

pub fn decode_i32(dec: &mut Decoder) -> i32 {
    decode_u32(dec) as i32
}

pub fn encode_u64(enc: &mut Encoder, value: u64) {
    let mut buf = [0u8; 8];
    LittleEndian::write_u64(&mut buf, value);
    enc.write_bytes(8, &buf);
}

pub fn decode_u64(dec: &mut Decoder) -> u64 {
    let mut buf = [0u8; 8];
    dec.read_bytes(8, &mut buf);
    LittleEndian::read_u64(&buf)
}

pub fn encode_f32(enc: &mut Encoder, value: f32) {
    encode_u32(enc, value.to_bits());
}

pub fn decode_f32(dec: &mut Decoder) -> f32 {
    f32::from_bits(decode_u32(dec))
}

pub fn encode_bool(enc: &mut Encoder, value: bool) {
    encode_u32(enc, value as u32);
}

pub fn decode_bool(dec: &mut Decoder) -> bool {
    decode_u32(dec) != 0
}

pub fn encode_identity(enc: &mut Encoder, id: ServerIdentity) {
    encode_u64(enc, id.0);
}

pub fn decode_identity(dec: &mut Decoder) -> ServerIdentity {
    ServerIdentity(decode_u64(dec))
}

/// Length-prefixed UTF-8 string: a `u32` byte length followed by the raw
/// bytes, unpadded. Invalid UTF-8 marks the decoder fatal rather than
/// panicking or silently substituting replacement characters.
pub fn encode_string(enc: &mut Encoder, value: &str) {
    let bytes = value.as_bytes();
    encode_u32(enc, bytes.len() as u32);
    enc.write_bytes(bytes.len(), bytes);
}

pub fn decode_string(dec: &mut Decoder) -> String {
    let len = decode_u32(dec) as usize;
    let handle = dec.alloc_temp(len);
    let mut buf = vec![0u8; len];
    dec.read_bytes(len, &mut buf);
    dec.temp_mut(handle).copy_from_slice(&buf);
    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(_) => {
            dec.set_fatal();
            String::new()
        }
    }
}

/// Length-prefixed opaque byte blob (shader code, push-constant data, the
/// payload of a host-memory shadow transfer).
pub fn encode_blob(enc: &mut Encoder, value: &[u8]) {
    encode_u32(enc, value.len() as u32);
    enc.write_bytes(value.len(), value);
}

pub fn decode_blob(dec: &mut Decoder) -> Vec<u8> {
    let len = decode_u32(dec) as usize;
    let mut buf = vec![0u8; len];
    dec.read_bytes(len, &mut buf);
    buf
}

/// Length-prefixed array of `u32`-encodable elements.
pub fn encode_u32_array(enc: &mut Encoder, values: &[u32]) {
    encode_u32(enc, values.len() as u32);
    for &v in values {
        encode_u32(enc, v);
    }
}

pub fn decode_u32_array(dec: &mut Decoder) -> Vec<u32> {
    let len = decode_u32(dec) as usize;
    let mut out = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        out.push(decode_u32(dec));
        if dec.is_fatal() {
            break;
        }
    }
    out
}

pub fn encode_identity_array(enc: &mut Encoder, values: &[ServerIdentity]) {
    encode_u32(enc, values.len() as u32);
    for &v in values {
        encode_identity(enc, v);
    }
}

pub fn decode_identity_array(dec: &mut Decoder) -> Vec<ServerIdentity> {
    let len = decode_u32(dec) as usize;
    let mut out = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        out.push(decode_identity(dec));
        if dec.is_fatal() {
            break;
        }
    }
    out
}

/// A field that may be the Vulkan null handle / null pointer: a presence
/// byte followed by the payload only when present.
pub fn encode_optional_identity(enc: &mut Encoder, value: Option<ServerIdentity>) {
    match value {
        Some(id) => {
            encode_bool(enc, true);
            encode_identity(enc, id);
        }
        None => encode_bool(enc, false),
    }
}

pub fn decode_optional_identity(dec: &mut Decoder) -> Option<ServerIdentity> {
    if decode_bool(dec) {
        Some(decode_identity(dec))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T>(encode: impl FnOnce(&mut Encoder), decode: impl FnOnce(&mut Decoder) -> T) -> T {
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode(&mut enc);
        assert!(!enc.is_fatal());
        let mut dec = Decoder::new(enc.data());
        let value = decode(&mut dec);
        assert!(!dec.is_fatal());
        value
    }

    #[test]
    fn scalars_round_trip() {
        assert_eq!(round_trip(|e| encode_u32(e, 42), decode_u32), 42);
        assert_eq!(round_trip(|e| encode_i32(e, -7), decode_i32), -7);
        assert_eq!(round_trip(|e| encode_u64(e, u64::MAX), decode_u64), u64::MAX);
        assert_eq!(round_trip(|e| encode_f32(e, 1.5), decode_f32), 1.5);
        assert!(round_trip(|e| encode_bool(e, true), decode_bool));
    }

    #[test]
    fn string_round_trips() {
        let s = round_trip(|e| encode_string(e, "venus"), decode_string);
        assert_eq!(s, "venus");
    }

    #[test]
    fn blob_round_trips() {
        let blob = round_trip(|e| encode_blob(e, &[1, 2, 3]), decode_blob);
        assert_eq!(blob, vec![1, 2, 3]);
    }

    #[test]
    fn optional_identity_round_trips_both_states() {
        let some = round_trip(
            |e| encode_optional_identity(e, Some(ServerIdentity(9))),
            decode_optional_identity,
        );
        assert_eq!(some, Some(ServerIdentity(9)));
        let none = round_trip(|e| encode_optional_identity(e, None), decode_optional_identity);
        assert_eq!(none, None);
    }

    #[test]
    fn identity_array_round_trips() {
        let values = vec![ServerIdentity(1), ServerIdentity(2), ServerIdentity(3)];
        let out = round_trip(|e| encode_identity_array(e, &values), decode_identity_array);
        assert_eq!(out, values);
    }

    #[test]
    fn invalid_utf8_marks_decoder_fatal() {
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_blob(&mut enc, &[0xff, 0xfe]);
        let mut dec = Decoder::new(enc.data());
        let _ = decode_string(&mut dec);
        assert!(dec.is_fatal());
    }
}
