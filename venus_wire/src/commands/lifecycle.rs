//! Command pool / command buffer lifecycle and recording.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;
use crate::primitives::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateCommandPoolArgs {
    pub device: ServerIdentity,
    pub queue_family_index: u32,
    pub flags: u32,
}

pub fn encode_create_command_pool_args(enc: &mut Encoder, args: &CreateCommandPoolArgs) {
    encode_identity(enc, args.device);
    encode_u32(enc, args.queue_family_index);
    encode_u32(enc, args.flags);
}

pub fn decode_create_command_pool_args(dec: &mut Decoder) -> CreateCommandPoolArgs {
    CreateCommandPoolArgs {
        device: decode_identity(dec),
        queue_family_index: decode_u32(dec),
        flags: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateCommandPoolReply {
    pub result: i32,
    pub command_pool: ServerIdentity,
}

pub fn encode_create_command_pool_reply(enc: &mut Encoder, reply: &CreateCommandPoolReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.command_pool);
}

pub fn decode_create_command_pool_reply(dec: &mut Decoder) -> CreateCommandPoolReply {
    CreateCommandPoolReply {
        result: decode_i32(dec),
        command_pool: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyCommandPoolArgs {
    pub device: ServerIdentity,
    pub command_pool: ServerIdentity,
}

pub fn encode_destroy_command_pool_args(enc: &mut Encoder, args: &DestroyCommandPoolArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.command_pool);
}

pub fn decode_destroy_command_pool_args(dec: &mut Decoder) -> DestroyCommandPoolArgs {
    DestroyCommandPoolArgs {
        device: decode_identity(dec),
        command_pool: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetCommandPoolArgs {
    pub device: ServerIdentity,
    pub command_pool: ServerIdentity,
    pub flags: u32,
}

pub fn encode_reset_command_pool_args(enc: &mut Encoder, args: &ResetCommandPoolArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.command_pool);
    encode_u32(enc, args.flags);
}

pub fn decode_reset_command_pool_args(dec: &mut Decoder) -> ResetCommandPoolArgs {
    ResetCommandPoolArgs {
        device: decode_identity(dec),
        command_pool: decode_identity(dec),
        flags: decode_u32(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocateCommandBuffersArgs {
    pub device: ServerIdentity,
    pub command_pool: ServerIdentity,
    pub level: u32,
    pub count: u32,
}

pub fn encode_allocate_command_buffers_args(enc: &mut Encoder, args: &AllocateCommandBuffersArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.command_pool);
    encode_u32(enc, args.level);
    encode_u32(enc, args.count);
}

pub fn decode_allocate_command_buffers_args(dec: &mut Decoder) -> AllocateCommandBuffersArgs {
    AllocateCommandBuffersArgs {
        device: decode_identity(dec),
        command_pool: decode_identity(dec),
        level: decode_u32(dec),
        count: decode_u32(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocateCommandBuffersReply {
    pub result: i32,
    pub command_buffers: Vec<ServerIdentity>,
}

pub fn encode_allocate_command_buffers_reply(enc: &mut Encoder, reply: &AllocateCommandBuffersReply) {
    encode_i32(enc, reply.result);
    encode_identity_array(enc, &reply.command_buffers);
}

pub fn decode_allocate_command_buffers_reply(dec: &mut Decoder) -> AllocateCommandBuffersReply {
    AllocateCommandBuffersReply {
        result: decode_i32(dec),
        command_buffers: decode_identity_array(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeCommandBuffersArgs {
    pub device: ServerIdentity,
    pub command_pool: ServerIdentity,
    pub command_buffers: Vec<ServerIdentity>,
}

pub fn encode_free_command_buffers_args(enc: &mut Encoder, args: &FreeCommandBuffersArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.command_pool);
    encode_identity_array(enc, &args.command_buffers);
}

pub fn decode_free_command_buffers_args(dec: &mut Decoder) -> FreeCommandBuffersArgs {
    FreeCommandBuffersArgs {
        device: decode_identity(dec),
        command_pool: decode_identity(dec),
        command_buffers: decode_identity_array(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeginCommandBufferArgs {
    pub command_buffer: ServerIdentity,
    pub flags: u32,
}

pub fn encode_begin_command_buffer_args(enc: &mut Encoder, args: &BeginCommandBufferArgs) {
    encode_identity(enc, args.command_buffer);
    encode_u32(enc, args.flags);
}

pub fn decode_begin_command_buffer_args(dec: &mut Decoder) -> BeginCommandBufferArgs {
    BeginCommandBufferArgs {
        command_buffer: decode_identity(dec),
        flags: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndCommandBufferArgs {
    pub command_buffer: ServerIdentity,
}

pub fn encode_end_command_buffer_args(enc: &mut Encoder, args: &EndCommandBufferArgs) {
    encode_identity(enc, args.command_buffer);
}

pub fn decode_end_command_buffer_args(dec: &mut Decoder) -> EndCommandBufferArgs {
    EndCommandBufferArgs {
        command_buffer: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetCommandBufferArgs {
    pub command_buffer: ServerIdentity,
    pub flags: u32,
}

pub fn encode_reset_command_buffer_args(enc: &mut Encoder, args: &ResetCommandBufferArgs) {
    encode_identity(enc, args.command_buffer);
    encode_u32(enc, args.flags);
}

pub fn decode_reset_command_buffer_args(dec: &mut Decoder) -> ResetCommandBufferArgs {
    ResetCommandBufferArgs {
        command_buffer: decode_identity(dec),
        flags: decode_u32(dec),
    }
}

/// `vkCmdBindDescriptorSets`. The registry elides a record of this call
/// when it would leave every binding slot at a given bind point unchanged;
/// the wire args are still sent in full since the elision is a client-side
/// recording optimisation, not a protocol one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdBindDescriptorSetsArgs {
    pub command_buffer: ServerIdentity,
    pub pipeline_bind_point: u32,
    pub pipeline_layout: ServerIdentity,
    pub first_set: u32,
    pub descriptor_sets: Vec<ServerIdentity>,
    pub dynamic_offsets: Vec<u32>,
}

pub fn encode_cmd_bind_descriptor_sets_args(enc: &mut Encoder, args: &CmdBindDescriptorSetsArgs) {
    encode_identity(enc, args.command_buffer);
    encode_u32(enc, args.pipeline_bind_point);
    encode_identity(enc, args.pipeline_layout);
    encode_u32(enc, args.first_set);
    encode_identity_array(enc, &args.descriptor_sets);
    encode_u32_array(enc, &args.dynamic_offsets);
}

pub fn decode_cmd_bind_descriptor_sets_args(dec: &mut Decoder) -> CmdBindDescriptorSetsArgs {
    CmdBindDescriptorSetsArgs {
        command_buffer: decode_identity(dec),
        pipeline_bind_point: decode_u32(dec),
        pipeline_layout: decode_identity(dec),
        first_set: decode_u32(dec),
        descriptor_sets: decode_identity_array(dec),
        dynamic_offsets: decode_u32_array(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferCopyRegion {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdCopyBufferArgs {
    pub command_buffer: ServerIdentity,
    pub src_buffer: ServerIdentity,
    pub dst_buffer: ServerIdentity,
    pub regions: Vec<BufferCopyRegion>,
}

pub fn encode_cmd_copy_buffer_args(enc: &mut Encoder, args: &CmdCopyBufferArgs) {
    encode_identity(enc, args.command_buffer);
    encode_identity(enc, args.src_buffer);
    encode_identity(enc, args.dst_buffer);
    encode_u32(enc, args.regions.len() as u32);
    for region in &args.regions {
        encode_u64(enc, region.src_offset);
        encode_u64(enc, region.dst_offset);
        encode_u64(enc, region.size);
    }
}

pub fn decode_cmd_copy_buffer_args(dec: &mut Decoder) -> CmdCopyBufferArgs {
    let command_buffer = decode_identity(dec);
    let src_buffer = decode_identity(dec);
    let dst_buffer = decode_identity(dec);
    let count = decode_u32(dec) as usize;
    let mut regions = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        regions.push(BufferCopyRegion {
            src_offset: decode_u64(dec),
            dst_offset: decode_u64(dec),
            size: decode_u64(dec),
        });
        if dec.is_fatal() {
            break;
        }
    }
    CmdCopyBufferArgs {
        command_buffer,
        src_buffer,
        dst_buffer,
        regions,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdFillBufferArgs {
    pub command_buffer: ServerIdentity,
    pub dst_buffer: ServerIdentity,
    pub dst_offset: u64,
    pub size: u64,
    pub data: u32,
}

pub fn encode_cmd_fill_buffer_args(enc: &mut Encoder, args: &CmdFillBufferArgs) {
    encode_identity(enc, args.command_buffer);
    encode_identity(enc, args.dst_buffer);
    encode_u64(enc, args.dst_offset);
    encode_u64(enc, args.size);
    encode_u32(enc, args.data);
}

pub fn decode_cmd_fill_buffer_args(dec: &mut Decoder) -> CmdFillBufferArgs {
    CmdFillBufferArgs {
        command_buffer: decode_identity(dec),
        dst_buffer: decode_identity(dec),
        dst_offset: decode_u64(dec),
        size: decode_u64(dec),
        data: decode_u32(dec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_command_buffers_round_trips() {
        let args = AllocateCommandBuffersArgs {
            device: ServerIdentity(1),
            command_pool: ServerIdentity(2),
            level: 0,
            count: 3,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_allocate_command_buffers_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_allocate_command_buffers_args(&mut dec), args);
    }

    #[test]
    fn cmd_copy_buffer_round_trips_with_regions() {
        let args = CmdCopyBufferArgs {
            command_buffer: ServerIdentity(5),
            src_buffer: ServerIdentity(6),
            dst_buffer: ServerIdentity(7),
            regions: vec![BufferCopyRegion {
                src_offset: 0,
                dst_offset: 0,
                size: 128,
            }],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_cmd_copy_buffer_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_cmd_copy_buffer_args(&mut dec), args);
    }

    #[test]
    fn cmd_bind_descriptor_sets_round_trips() {
        let args = CmdBindDescriptorSetsArgs {
            command_buffer: ServerIdentity(5),
            pipeline_bind_point: 0,
            pipeline_layout: ServerIdentity(9),
            first_set: 0,
            descriptor_sets: vec![ServerIdentity(10)],
            dynamic_offsets: vec![0, 64],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_cmd_bind_descriptor_sets_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_cmd_bind_descriptor_sets_args(&mut dec), args);
    }
}
