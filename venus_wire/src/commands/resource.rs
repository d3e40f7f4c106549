//! Buffer, image and device-memory lifecycle and binding.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;
use crate::primitives::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateBufferArgs {
    pub device: ServerIdentity,
    pub size: u64,
    pub usage: u32,
    pub sharing_mode: u32,
}

pub fn encode_create_buffer_args(enc: &mut Encoder, args: &CreateBufferArgs) {
    encode_identity(enc, args.device);
    encode_u64(enc, args.size);
    encode_u32(enc, args.usage);
    encode_u32(enc, args.sharing_mode);
}

pub fn decode_create_buffer_args(dec: &mut Decoder) -> CreateBufferArgs {
    CreateBufferArgs {
        device: decode_identity(dec),
        size: decode_u64(dec),
        usage: decode_u32(dec),
        sharing_mode: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateBufferReply {
    pub result: i32,
    pub buffer: ServerIdentity,
}

pub fn encode_create_buffer_reply(enc: &mut Encoder, reply: &CreateBufferReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.buffer);
}

pub fn decode_create_buffer_reply(dec: &mut Decoder) -> CreateBufferReply {
    CreateBufferReply {
        result: decode_i32(dec),
        buffer: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyBufferArgs {
    pub device: ServerIdentity,
    pub buffer: ServerIdentity,
}

pub fn encode_destroy_buffer_args(enc: &mut Encoder, args: &DestroyBufferArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.buffer);
}

pub fn decode_destroy_buffer_args(dec: &mut Decoder) -> DestroyBufferArgs {
    DestroyBufferArgs {
        device: decode_identity(dec),
        buffer: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateImageArgs {
    pub device: ServerIdentity,
    pub image_type: u32,
    pub format: i32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: u32,
}

pub fn encode_create_image_args(enc: &mut Encoder, args: &CreateImageArgs) {
    encode_identity(enc, args.device);
    encode_u32(enc, args.image_type);
    encode_i32(enc, args.format);
    encode_u32(enc, args.width);
    encode_u32(enc, args.height);
    encode_u32(enc, args.depth);
    encode_u32(enc, args.mip_levels);
    encode_u32(enc, args.array_layers);
    encode_u32(enc, args.usage);
}

pub fn decode_create_image_args(dec: &mut Decoder) -> CreateImageArgs {
    CreateImageArgs {
        device: decode_identity(dec),
        image_type: decode_u32(dec),
        format: decode_i32(dec),
        width: decode_u32(dec),
        height: decode_u32(dec),
        depth: decode_u32(dec),
        mip_levels: decode_u32(dec),
        array_layers: decode_u32(dec),
        usage: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateImageReply {
    pub result: i32,
    pub image: ServerIdentity,
}

pub fn encode_create_image_reply(enc: &mut Encoder, reply: &CreateImageReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.image);
}

pub fn decode_create_image_reply(dec: &mut Decoder) -> CreateImageReply {
    CreateImageReply {
        result: decode_i32(dec),
        image: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyImageArgs {
    pub device: ServerIdentity,
    pub image: ServerIdentity,
}

pub fn encode_destroy_image_args(enc: &mut Encoder, args: &DestroyImageArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.image);
}

pub fn decode_destroy_image_args(dec: &mut Decoder) -> DestroyImageArgs {
    DestroyImageArgs {
        device: decode_identity(dec),
        image: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetMemoryRequirementsArgs {
    pub device: ServerIdentity,
    pub resource: ServerIdentity,
}

pub fn encode_get_memory_requirements_args(enc: &mut Encoder, args: &GetMemoryRequirementsArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.resource);
}

pub fn decode_get_memory_requirements_args(dec: &mut Decoder) -> GetMemoryRequirementsArgs {
    GetMemoryRequirementsArgs {
        device: decode_identity(dec),
        resource: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirementsReply {
    pub size: u64,
    pub alignment: u64,
    pub memory_type_bits: u32,
}

pub fn encode_memory_requirements_reply(enc: &mut Encoder, reply: &MemoryRequirementsReply) {
    encode_u64(enc, reply.size);
    encode_u64(enc, reply.alignment);
    encode_u32(enc, reply.memory_type_bits);
}

pub fn decode_memory_requirements_reply(dec: &mut Decoder) -> MemoryRequirementsReply {
    MemoryRequirementsReply {
        size: decode_u64(dec),
        alignment: decode_u64(dec),
        memory_type_bits: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocateMemoryArgs {
    pub device: ServerIdentity,
    pub allocation_size: u64,
    pub memory_type_index: u32,
}

pub fn encode_allocate_memory_args(enc: &mut Encoder, args: &AllocateMemoryArgs) {
    encode_identity(enc, args.device);
    encode_u64(enc, args.allocation_size);
    encode_u32(enc, args.memory_type_index);
}

pub fn decode_allocate_memory_args(dec: &mut Decoder) -> AllocateMemoryArgs {
    AllocateMemoryArgs {
        device: decode_identity(dec),
        allocation_size: decode_u64(dec),
        memory_type_index: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocateMemoryReply {
    pub result: i32,
    pub memory: ServerIdentity,
}

pub fn encode_allocate_memory_reply(enc: &mut Encoder, reply: &AllocateMemoryReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.memory);
}

pub fn decode_allocate_memory_reply(dec: &mut Decoder) -> AllocateMemoryReply {
    AllocateMemoryReply {
        result: decode_i32(dec),
        memory: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeMemoryArgs {
    pub device: ServerIdentity,
    pub memory: ServerIdentity,
}

pub fn encode_free_memory_args(enc: &mut Encoder, args: &FreeMemoryArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.memory);
}

pub fn decode_free_memory_args(dec: &mut Decoder) -> FreeMemoryArgs {
    FreeMemoryArgs {
        device: decode_identity(dec),
        memory: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindResourceMemoryArgs {
    pub device: ServerIdentity,
    pub resource: ServerIdentity,
    pub memory: ServerIdentity,
    pub memory_offset: u64,
}

pub fn encode_bind_resource_memory_args(enc: &mut Encoder, args: &BindResourceMemoryArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.resource);
    encode_identity(enc, args.memory);
    encode_u64(enc, args.memory_offset);
}

pub fn decode_bind_resource_memory_args(dec: &mut Decoder) -> BindResourceMemoryArgs {
    BindResourceMemoryArgs {
        device: decode_identity(dec),
        resource: decode_identity(dec),
        memory: decode_identity(dec),
        memory_offset: decode_u64(dec),
    }
}

/// Shared reply shape for the four resource operations here that carry no
/// payload beyond a `VkResult` -- the actual bytes travel separately over
/// `venus_wire::commands::memory_transfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceResultReply {
    pub result: i32,
}

pub fn encode_resource_result_reply(enc: &mut Encoder, reply: &ResourceResultReply) {
    encode_i32(enc, reply.result);
}

pub fn decode_resource_result_reply(dec: &mut Decoder) -> ResourceResultReply {
    ResourceResultReply {
        result: decode_i32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapMemoryArgs {
    pub device: ServerIdentity,
    pub memory: ServerIdentity,
    pub offset: u64,
    pub size: u64,
}

pub fn encode_map_memory_args(enc: &mut Encoder, args: &MapMemoryArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.memory);
    encode_u64(enc, args.offset);
    encode_u64(enc, args.size);
}

pub fn decode_map_memory_args(dec: &mut Decoder) -> MapMemoryArgs {
    MapMemoryArgs {
        device: decode_identity(dec),
        memory: decode_identity(dec),
        offset: decode_u64(dec),
        size: decode_u64(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmapMemoryArgs {
    pub device: ServerIdentity,
    pub memory: ServerIdentity,
}

pub fn encode_unmap_memory_args(enc: &mut Encoder, args: &UnmapMemoryArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.memory);
}

pub fn decode_unmap_memory_args(dec: &mut Decoder) -> UnmapMemoryArgs {
    UnmapMemoryArgs {
        device: decode_identity(dec),
        memory: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedMemoryRange {
    pub memory: ServerIdentity,
    pub offset: u64,
    pub size: u64,
}

pub fn encode_mapped_memory_ranges(enc: &mut Encoder, ranges: &[MappedMemoryRange]) {
    encode_u32(enc, ranges.len() as u32);
    for range in ranges {
        encode_identity(enc, range.memory);
        encode_u64(enc, range.offset);
        encode_u64(enc, range.size);
    }
}

pub fn decode_mapped_memory_ranges(dec: &mut Decoder) -> Vec<MappedMemoryRange> {
    let count = decode_u32(dec) as usize;
    let mut out = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        out.push(MappedMemoryRange {
            memory: decode_identity(dec),
            offset: decode_u64(dec),
            size: decode_u64(dec),
        });
        if dec.is_fatal() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_buffer_round_trips() {
        let args = CreateBufferArgs {
            device: ServerIdentity(3),
            size: 4096,
            usage: 0x20,
            sharing_mode: 0,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_create_buffer_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_create_buffer_args(&mut dec), args);
    }

    #[test]
    fn bind_resource_memory_round_trips() {
        let args = BindResourceMemoryArgs {
            device: ServerIdentity(3),
            resource: ServerIdentity(7),
            memory: ServerIdentity(9),
            memory_offset: 256,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_bind_resource_memory_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_bind_resource_memory_args(&mut dec), args);
    }

    #[test]
    fn resource_result_reply_round_trips() {
        let reply = ResourceResultReply { result: -4 };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_resource_result_reply(&mut enc, &reply);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_resource_result_reply(&mut dec), reply);
    }

    #[test]
    fn mapped_memory_ranges_round_trip() {
        let ranges = vec![
            MappedMemoryRange {
                memory: ServerIdentity(1),
                offset: 0,
                size: 64,
            },
            MappedMemoryRange {
                memory: ServerIdentity(1),
                offset: 64,
                size: 64,
            },
        ];
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_mapped_memory_ranges(&mut enc, &ranges);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_mapped_memory_ranges(&mut dec), ranges);
    }
}
