//! Command discriminant and per-command header.
//!
//! A command is framed as a 32-bit [`CommandId`] followed by a 32-bit
//! [`CommandFlags`] word, then the command's own argument encoding. `CommandId`
//! is a newtype over `u32` rather than a closed Rust enum: the decoder must be
//! able to represent an id it doesn't recognise (a newer client talking to an
//! older server) without that being a decode error in itself -- only
//! *dispatching* an unknown id is an error.

use byteorder::{ByteOrder, LittleEndian};

use crate::decoder::Decoder;
use crate::encoder::Encoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub u32);

impl CommandId {
    // Instance / physical device / device / queue lifecycle.
    pub const CREATE_INSTANCE: CommandId = CommandId(1);
    pub const DESTROY_INSTANCE: CommandId = CommandId(2);
    pub const ENUMERATE_PHYSICAL_DEVICES: CommandId = CommandId(3);
    pub const GET_PHYSICAL_DEVICE_PROPERTIES: CommandId = CommandId(4);
    pub const GET_PHYSICAL_DEVICE_MEMORY_PROPERTIES: CommandId = CommandId(5);
    pub const CREATE_DEVICE: CommandId = CommandId(6);
    pub const DESTROY_DEVICE: CommandId = CommandId(7);
    pub const GET_DEVICE_QUEUE: CommandId = CommandId(8);
    /// Version handshake: the client sends this before `CREATE_INSTANCE` to
    /// confirm the server speaks a registry version this client understands
    ///.
    pub const ENUMERATE_INSTANCE_VERSION: CommandId = CommandId(9);

    // Resource & binding (buffers, images, memory).
    pub const CREATE_BUFFER: CommandId = CommandId(20);
    pub const DESTROY_BUFFER: CommandId = CommandId(21);
    pub const CREATE_IMAGE: CommandId = CommandId(22);
    pub const DESTROY_IMAGE: CommandId = CommandId(23);
    pub const GET_BUFFER_MEMORY_REQUIREMENTS: CommandId = CommandId(24);
    pub const GET_IMAGE_MEMORY_REQUIREMENTS: CommandId = CommandId(25);
    pub const ALLOCATE_MEMORY: CommandId = CommandId(26);
    pub const FREE_MEMORY: CommandId = CommandId(27);
    pub const BIND_BUFFER_MEMORY: CommandId = CommandId(28);
    pub const BIND_IMAGE_MEMORY: CommandId = CommandId(29);
    pub const MAP_MEMORY: CommandId = CommandId(30);
    pub const UNMAP_MEMORY: CommandId = CommandId(31);
    pub const FLUSH_MAPPED_MEMORY_RANGES: CommandId = CommandId(32);
    pub const INVALIDATE_MAPPED_MEMORY_RANGES: CommandId = CommandId(33);

    // Command pool / command buffer lifecycle and recording.
    pub const CREATE_COMMAND_POOL: CommandId = CommandId(40);
    pub const DESTROY_COMMAND_POOL: CommandId = CommandId(41);
    pub const RESET_COMMAND_POOL: CommandId = CommandId(42);
    pub const ALLOCATE_COMMAND_BUFFERS: CommandId = CommandId(43);
    pub const FREE_COMMAND_BUFFERS: CommandId = CommandId(44);
    pub const BEGIN_COMMAND_BUFFER: CommandId = CommandId(45);
    pub const END_COMMAND_BUFFER: CommandId = CommandId(46);
    pub const RESET_COMMAND_BUFFER: CommandId = CommandId(47);
    pub const CMD_BIND_DESCRIPTOR_SETS: CommandId = CommandId(48);
    pub const CMD_COPY_BUFFER: CommandId = CommandId(49);
    pub const CMD_FILL_BUFFER: CommandId = CommandId(50);

    // Synchronisation primitives and submission.
    pub const CREATE_FENCE: CommandId = CommandId(60);
    pub const DESTROY_FENCE: CommandId = CommandId(61);
    pub const RESET_FENCES: CommandId = CommandId(62);
    pub const WAIT_FOR_FENCES: CommandId = CommandId(63);
    pub const GET_FENCE_STATUS: CommandId = CommandId(64);
    pub const CREATE_SEMAPHORE: CommandId = CommandId(65);
    pub const DESTROY_SEMAPHORE: CommandId = CommandId(66);
    pub const SIGNAL_SEMAPHORE: CommandId = CommandId(67);
    pub const WAIT_SEMAPHORES: CommandId = CommandId(68);
    pub const GET_SEMAPHORE_COUNTER_VALUE: CommandId = CommandId(69);
    pub const CREATE_EVENT: CommandId = CommandId(70);
    pub const DESTROY_EVENT: CommandId = CommandId(71);
    pub const SET_EVENT: CommandId = CommandId(72);
    pub const RESET_EVENT: CommandId = CommandId(73);
    pub const GET_EVENT_STATUS: CommandId = CommandId(74);
    pub const QUEUE_SUBMIT: CommandId = CommandId(75);
    pub const QUEUE_WAIT_IDLE: CommandId = CommandId(76);
    pub const DEVICE_WAIT_IDLE: CommandId = CommandId(77);

    // Query pools.
    pub const CREATE_QUERY_POOL: CommandId = CommandId(80);
    pub const DESTROY_QUERY_POOL: CommandId = CommandId(81);
    pub const CMD_RESET_QUERY_POOL: CommandId = CommandId(82);
    pub const CMD_BEGIN_QUERY: CommandId = CommandId(83);
    pub const CMD_END_QUERY: CommandId = CommandId(84);
    pub const GET_QUERY_POOL_RESULTS: CommandId = CommandId(85);

    // Reserved host-memory shadow transfer commands; these ids are fixed by
    // the protocol and never reassigned even as other commands are added.
    pub const TRANSFER_MEMORY_DATA: CommandId = CommandId(0x1000_0000);
    pub const READ_MEMORY_DATA: CommandId = CommandId(0x1000_0001);

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

bitflags::bitflags! {
    /// Per-command modifiers carried alongside the discriminant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u32 {
        /// The caller blocks on a reply for this command.
        const REPLY_EXPECTED = 0b0000_0001;
        /// The payload continues a batched sequence of commands that must
        /// be dispatched atomically with respect to other ring traffic.
        const BATCH_CONTINUATION = 0b0000_0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub id: CommandId,
    pub flags: CommandFlags,
}

pub const COMMAND_HEADER_LEN: usize = 8;

impl CommandHeader {
    pub fn new(id: CommandId, flags: CommandFlags) -> Self {
        Self { id, flags }
    }

    pub fn encode(&self, enc: &mut Encoder) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, self.id.as_u32());
        enc.write_bytes(4, &buf);
        LittleEndian::write_u32(&mut buf, self.flags.bits());
        enc.write_bytes(4, &buf);
    }

    pub fn decode(dec: &mut Decoder) -> Self {
        let mut buf = [0u8; 4];
        dec.read_bytes(4, &mut buf);
        let id = CommandId(LittleEndian::read_u32(&buf));
        dec.read_bytes(4, &mut buf);
        let flags = CommandFlags::from_bits_truncate(LittleEndian::read_u32(&buf));
        Self { id, flags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let mut enc = Encoder::dynamic();
        enc.acquire();
        let header = CommandHeader::new(CommandId::QUEUE_SUBMIT, CommandFlags::REPLY_EXPECTED);
        header.encode(&mut enc);
        let mut dec = Decoder::new(enc.data());
        let decoded = CommandHeader::decode(&mut dec);
        assert_eq!(header, decoded);
    }

    #[test]
    fn reserved_memory_transfer_ids_are_fixed() {
        assert_eq!(CommandId::TRANSFER_MEMORY_DATA.as_u32(), 0x1000_0000);
        assert_eq!(CommandId::READ_MEMORY_DATA.as_u32(), 0x1000_0001);
    }

    #[test]
    fn unknown_flag_bits_are_truncated_not_fatal() {
        let mut enc = Encoder::dynamic();
        enc.acquire();
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, CommandId::CREATE_FENCE.as_u32());
        enc.write_bytes(4, &buf);
        LittleEndian::write_u32(&mut buf, 0xFFFF_FFFF);
        enc.write_bytes(4, &buf);
        let mut dec = Decoder::new(enc.data());
        let header = CommandHeader::decode(&mut dec);
        assert!(!dec.is_fatal());
        assert!(header.flags.contains(CommandFlags::REPLY_EXPECTED));
    }
}
