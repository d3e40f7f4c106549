//! Command-stream wire codec for the Venus Plus remoting protocol.
//!
//! This crate owns the byte-level contract between a client driver and a
//! remote Vulkan implementation: the frame header, the command discriminant
//! and flags, the scalar/array/string/blob primitives, the structure-chain
//! (`pNext`) codec, and hand-written encode/decode routines for the command
//! set the rest of the workspace needs. It has no notion of sockets, object
//! registries, or the ring -- those live in `venus_transport`,
//! `venus_registry` and `venus_ring` respectively.

pub mod command;
pub mod commands;
pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod handle;
pub mod primitives;
pub mod structs;

pub use command::{CommandFlags, CommandHeader, CommandId, COMMAND_HEADER_LEN};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use frame::{FrameHeader, FRAME_HEADER_LEN, FRAME_MAGIC, MAX_FRAME_PAYLOAD};
pub use handle::{ObjectCategory, ServerIdentity};

/// Bumped whenever the wire layout of an existing command changes in a way
/// that isn't backward compatible. The handshake command exchanges this
/// value before either side trusts the rest of the stream.
pub const WIRE_FORMAT_VERSION: u32 = 1;

/// The Vulkan API version this codec's hand-written command set was written
/// against. Exposed so `venus_driver` and `venus_server` can refuse a
/// handshake against a peer that predates the structures they encode.
pub const VULKAN_XML_REGISTRY_VERSION: u32 = vulkan_version(1, 3, 0);

const fn vulkan_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 22) | (minor << 12) | patch
}

#[derive(Debug, thiserror::Error)]
pub enum VenusWireError {
    #[error("frame magic mismatch: expected {:#x}, found {0:#x}", FRAME_MAGIC)]
    BadMagic(u32),
    #[error("frame payload of {0} bytes exceeds the {MAX_FRAME_PAYLOAD} byte cap")]
    FrameTooLarge(u32),
    #[error("command decode marked the decoder fatal")]
    DecodeFatal,
    #[error("command encode marked the encoder fatal")]
    EncodeFatal,
}

pub type Result<T> = std::result::Result<T, VenusWireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulkan_version_packs_as_expected() {
        assert_eq!(vulkan_version(1, 3, 0), (1u32 << 22) | (3u32 << 12));
    }
}
