//! Structure-chain (`pNext`) codec.
//!
//! A chainable Vulkan structure serialises as: its `sType`, a presence bit
//! for the next link, the next link encoded recursively when present, and
//! finally the struct's own body (everything but `sType`/`pNext`). Decoding
//! an `sType` the registry doesn't recognise is a fatal decode error; the
//! encoder instead silently drops an unrecognised link so a client linked
//! against a newer Vulkan than the server still produces a chain the server
//! can decode.

use ash::vk;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::primitives::{decode_bool, decode_u32, encode_bool, encode_u32};

/// One link of a decoded extension chain: its structure type and the raw,
/// not-yet-interpreted bytes of its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionNode {
    pub s_type: vk::StructureType,
    pub body: Vec<u8>,
}

/// The set of extension structure types this codec revision recognises.
/// Anything outside this list is fatal on decode and silently dropped on
/// encode.
pub fn is_known_extension(s_type: vk::StructureType) -> bool {
    matches!(
        s_type,
        vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_2_FEATURES
            | vk::StructureType::PHYSICAL_DEVICE_VULKAN_1_3_FEATURES
            | vk::StructureType::MEMORY_ALLOCATE_FLAGS_INFO
    )
}

pub fn encode_chain(enc: &mut Encoder, chain: &[ExtensionNode]) {
    match chain.split_first() {
        None => encode_bool(enc, false),
        Some((head, rest)) => {
            if !is_known_extension(head.s_type) {
                // Drop the unrecognised link, keep walking the rest of the
                // chain as if it were absent.
                encode_chain(enc, rest);
                return;
            }
            encode_bool(enc, true);
            encode_u32(enc, head.s_type.as_raw() as u32);
            encode_chain(enc, rest);
            encode_u32(enc, head.body.len() as u32);
            enc.write_bytes(head.body.len(), &head.body);
        }
    }
}

pub fn decode_chain(dec: &mut Decoder) -> Vec<ExtensionNode> {
    if !decode_bool(dec) {
        return Vec::new();
    }
    let s_type = vk::StructureType::from_raw(decode_u32(dec) as i32);
    if !is_known_extension(s_type) {
        dec.set_fatal();
        return Vec::new();
    }
    let mut rest = decode_chain(dec);
    let len = decode_u32(dec) as usize;
    let mut body = vec![0u8; len];
    dec.read_bytes(len, &mut body);
    rest.insert(0, ExtensionNode { s_type, body });
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_round_trips() {
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_chain(&mut enc, &[]);
        let mut dec = Decoder::new(enc.data());
        let chain = decode_chain(&mut dec);
        assert!(chain.is_empty());
        assert!(!dec.is_fatal());
    }

    #[test]
    fn known_extension_round_trips() {
        let node = ExtensionNode {
            s_type: vk::StructureType::MEMORY_ALLOCATE_FLAGS_INFO,
            body: vec![1, 2, 3, 4],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_chain(&mut enc, std::slice::from_ref(&node));
        let mut dec = Decoder::new(enc.data());
        let chain = decode_chain(&mut dec);
        assert_eq!(chain, vec![node]);
        assert!(!dec.is_fatal());
    }

    #[test]
    fn unknown_extension_is_dropped_on_encode() {
        let node = ExtensionNode {
            s_type: vk::StructureType::from_raw(0x7fff_ffff),
            body: vec![9],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_chain(&mut enc, std::slice::from_ref(&node));
        let mut dec = Decoder::new(enc.data());
        let chain = decode_chain(&mut dec);
        assert!(chain.is_empty());
        assert!(!dec.is_fatal());
    }

    #[test]
    fn unknown_extension_on_wire_is_fatal_to_decode() {
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_bool(&mut enc, true);
        encode_u32(&mut enc, 0x7fff_ffff_u32);
        let mut dec = Decoder::new(enc.data());
        let chain = decode_chain(&mut dec);
        assert!(chain.is_empty());
        assert!(dec.is_fatal());
    }
}
