//! Query pools.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;
use crate::primitives::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateQueryPoolArgs {
    pub device: ServerIdentity,
    pub query_type: u32,
    pub query_count: u32,
}

pub fn encode_create_query_pool_args(enc: &mut Encoder, args: &CreateQueryPoolArgs) {
    encode_identity(enc, args.device);
    encode_u32(enc, args.query_type);
    encode_u32(enc, args.query_count);
}

pub fn decode_create_query_pool_args(dec: &mut Decoder) -> CreateQueryPoolArgs {
    CreateQueryPoolArgs {
        device: decode_identity(dec),
        query_type: decode_u32(dec),
        query_count: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateQueryPoolReply {
    pub result: i32,
    pub query_pool: ServerIdentity,
}

pub fn encode_create_query_pool_reply(enc: &mut Encoder, reply: &CreateQueryPoolReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.query_pool);
}

pub fn decode_create_query_pool_reply(dec: &mut Decoder) -> CreateQueryPoolReply {
    CreateQueryPoolReply {
        result: decode_i32(dec),
        query_pool: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyQueryPoolArgs {
    pub device: ServerIdentity,
    pub query_pool: ServerIdentity,
}

pub fn encode_destroy_query_pool_args(enc: &mut Encoder, args: &DestroyQueryPoolArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.query_pool);
}

pub fn decode_destroy_query_pool_args(dec: &mut Decoder) -> DestroyQueryPoolArgs {
    DestroyQueryPoolArgs {
        device: decode_identity(dec),
        query_pool: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdQueryRangeArgs {
    pub command_buffer: ServerIdentity,
    pub query_pool: ServerIdentity,
    pub first_query: u32,
    pub query_count: u32,
}

pub fn encode_cmd_query_range_args(enc: &mut Encoder, args: &CmdQueryRangeArgs) {
    encode_identity(enc, args.command_buffer);
    encode_identity(enc, args.query_pool);
    encode_u32(enc, args.first_query);
    encode_u32(enc, args.query_count);
}

pub fn decode_cmd_query_range_args(dec: &mut Decoder) -> CmdQueryRangeArgs {
    CmdQueryRangeArgs {
        command_buffer: decode_identity(dec),
        query_pool: decode_identity(dec),
        first_query: decode_u32(dec),
        query_count: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdBeginQueryArgs {
    pub command_buffer: ServerIdentity,
    pub query_pool: ServerIdentity,
    pub query: u32,
    pub flags: u32,
}

pub fn encode_cmd_begin_query_args(enc: &mut Encoder, args: &CmdBeginQueryArgs) {
    encode_identity(enc, args.command_buffer);
    encode_identity(enc, args.query_pool);
    encode_u32(enc, args.query);
    encode_u32(enc, args.flags);
}

pub fn decode_cmd_begin_query_args(dec: &mut Decoder) -> CmdBeginQueryArgs {
    CmdBeginQueryArgs {
        command_buffer: decode_identity(dec),
        query_pool: decode_identity(dec),
        query: decode_u32(dec),
        flags: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdEndQueryArgs {
    pub command_buffer: ServerIdentity,
    pub query_pool: ServerIdentity,
    pub query: u32,
}

pub fn encode_cmd_end_query_args(enc: &mut Encoder, args: &CmdEndQueryArgs) {
    encode_identity(enc, args.command_buffer);
    encode_identity(enc, args.query_pool);
    encode_u32(enc, args.query);
}

pub fn decode_cmd_end_query_args(dec: &mut Decoder) -> CmdEndQueryArgs {
    CmdEndQueryArgs {
        command_buffer: decode_identity(dec),
        query_pool: decode_identity(dec),
        query: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetQueryPoolResultsArgs {
    pub device: ServerIdentity,
    pub query_pool: ServerIdentity,
    pub first_query: u32,
    pub query_count: u32,
    pub flags: u32,
}

pub fn encode_get_query_pool_results_args(enc: &mut Encoder, args: &GetQueryPoolResultsArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.query_pool);
    encode_u32(enc, args.first_query);
    encode_u32(enc, args.query_count);
    encode_u32(enc, args.flags);
}

pub fn decode_get_query_pool_results_args(dec: &mut Decoder) -> GetQueryPoolResultsArgs {
    GetQueryPoolResultsArgs {
        device: decode_identity(dec),
        query_pool: decode_identity(dec),
        first_query: decode_u32(dec),
        query_count: decode_u32(dec),
        flags: decode_u32(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetQueryPoolResultsReply {
    pub result: i32,
    pub values: Vec<u64>,
}

pub fn encode_get_query_pool_results_reply(enc: &mut Encoder, reply: &GetQueryPoolResultsReply) {
    encode_i32(enc, reply.result);
    encode_u32(enc, reply.values.len() as u32);
    for v in &reply.values {
        encode_u64(enc, *v);
    }
}

pub fn decode_get_query_pool_results_reply(dec: &mut Decoder) -> GetQueryPoolResultsReply {
    let result = decode_i32(dec);
    let count = decode_u32(dec) as usize;
    let mut values = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        values.push(decode_u64(dec));
        if dec.is_fatal() {
            break;
        }
    }
    GetQueryPoolResultsReply { result, values }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_query_pool_round_trips() {
        let args = CreateQueryPoolArgs {
            device: ServerIdentity(1),
            query_type: 0,
            query_count: 16,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_create_query_pool_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_create_query_pool_args(&mut dec), args);
    }

    #[test]
    fn query_pool_results_round_trip() {
        let reply = GetQueryPoolResultsReply {
            result: 0,
            values: vec![1, 2, 3],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_get_query_pool_results_reply(&mut enc, &reply);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_get_query_pool_results_reply(&mut dec), reply);
    }
}
