//! The two reserved host-memory shadow transfer commands.
//!
//! `CommandId::TRANSFER_MEMORY_DATA` (push, client -> server) and
//! `CommandId::READ_MEMORY_DATA` (pull, server -> client) are the only
//! commands whose ids are fixed by the protocol rather than assigned from
//! this codec's local numbering; `venus_shadow` is the only caller.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;
use crate::primitives::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMemoryDataArgs {
    pub device: ServerIdentity,
    pub memory: ServerIdentity,
    pub offset: u64,
    pub data: Vec<u8>,
}

pub fn encode_transfer_memory_data_args(enc: &mut Encoder, args: &TransferMemoryDataArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.memory);
    encode_u64(enc, args.offset);
    encode_blob(enc, &args.data);
}

pub fn decode_transfer_memory_data_args(dec: &mut Decoder) -> TransferMemoryDataArgs {
    TransferMemoryDataArgs {
        device: decode_identity(dec),
        memory: decode_identity(dec),
        offset: decode_u64(dec),
        data: decode_blob(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferMemoryDataReply {
    pub result: i32,
}

pub fn encode_transfer_memory_data_reply(enc: &mut Encoder, reply: &TransferMemoryDataReply) {
    encode_i32(enc, reply.result);
}

pub fn decode_transfer_memory_data_reply(dec: &mut Decoder) -> TransferMemoryDataReply {
    TransferMemoryDataReply {
        result: decode_i32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMemoryDataArgs {
    pub device: ServerIdentity,
    pub memory: ServerIdentity,
    pub offset: u64,
    pub size: u64,
}

pub fn encode_read_memory_data_args(enc: &mut Encoder, args: &ReadMemoryDataArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.memory);
    encode_u64(enc, args.offset);
    encode_u64(enc, args.size);
}

pub fn decode_read_memory_data_args(dec: &mut Decoder) -> ReadMemoryDataArgs {
    ReadMemoryDataArgs {
        device: decode_identity(dec),
        memory: decode_identity(dec),
        offset: decode_u64(dec),
        size: decode_u64(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMemoryDataReply {
    pub result: i32,
    pub data: Vec<u8>,
}

pub fn encode_read_memory_data_reply(enc: &mut Encoder, reply: &ReadMemoryDataReply) {
    encode_i32(enc, reply.result);
    encode_blob(enc, &reply.data);
}

pub fn decode_read_memory_data_reply(dec: &mut Decoder) -> ReadMemoryDataReply {
    ReadMemoryDataReply {
        result: decode_i32(dec),
        data: decode_blob(dec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_memory_data_round_trips() {
        let args = TransferMemoryDataArgs {
            device: ServerIdentity(1),
            memory: ServerIdentity(2),
            offset: 16,
            data: vec![0xAB; 64],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_transfer_memory_data_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_transfer_memory_data_args(&mut dec), args);
    }

    #[test]
    fn read_memory_data_reply_round_trips() {
        let reply = ReadMemoryDataReply {
            result: 0,
            data: vec![1, 2, 3, 4, 5],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_read_memory_data_reply(&mut enc, &reply);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_read_memory_data_reply(&mut dec), reply);
    }

    #[test]
    fn empty_transfer_is_valid() {
        let args = TransferMemoryDataArgs {
            device: ServerIdentity(1),
            memory: ServerIdentity(2),
            offset: 0,
            data: vec![],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_transfer_memory_data_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_transfer_memory_data_args(&mut dec), args);
    }
}
