//! `vkCreateDevice` / `vkGetDeviceQueue`.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;
use crate::primitives::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueCreateInfo {
    pub queue_family_index: u32,
    pub queue_priorities: Vec<u32>, // fixed-point: this codec never puts a float on the wire
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceArgs {
    pub physical_device: ServerIdentity,
    pub queue_create_infos: Vec<QueueCreateInfo>,
    pub enabled_extensions: Vec<String>,
}

pub fn encode_create_device_args(enc: &mut Encoder, args: &CreateDeviceArgs) {
    encode_identity(enc, args.physical_device);
    encode_u32(enc, args.queue_create_infos.len() as u32);
    for qci in &args.queue_create_infos {
        encode_u32(enc, qci.queue_family_index);
        encode_u32_array(enc, &qci.queue_priorities);
    }
    encode_u32(enc, args.enabled_extensions.len() as u32);
    for ext in &args.enabled_extensions {
        encode_string(enc, ext);
    }
}

pub fn decode_create_device_args(dec: &mut Decoder) -> CreateDeviceArgs {
    let physical_device = decode_identity(dec);
    let qci_count = decode_u32(dec) as usize;
    let mut queue_create_infos = Vec::with_capacity(qci_count.min(64));
    for _ in 0..qci_count {
        let queue_family_index = decode_u32(dec);
        let queue_priorities = decode_u32_array(dec);
        queue_create_infos.push(QueueCreateInfo {
            queue_family_index,
            queue_priorities,
        });
        if dec.is_fatal() {
            break;
        }
    }
    let ext_count = decode_u32(dec) as usize;
    let mut enabled_extensions = Vec::with_capacity(ext_count.min(256));
    for _ in 0..ext_count {
        enabled_extensions.push(decode_string(dec));
        if dec.is_fatal() {
            break;
        }
    }
    CreateDeviceArgs {
        physical_device,
        queue_create_infos,
        enabled_extensions,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateDeviceReply {
    pub result: i32,
    pub device: ServerIdentity,
}

pub fn encode_create_device_reply(enc: &mut Encoder, reply: &CreateDeviceReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.device);
}

pub fn decode_create_device_reply(dec: &mut Decoder) -> CreateDeviceReply {
    CreateDeviceReply {
        result: decode_i32(dec),
        device: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyDeviceArgs {
    pub device: ServerIdentity,
}

pub fn encode_destroy_device_args(enc: &mut Encoder, args: &DestroyDeviceArgs) {
    encode_identity(enc, args.device);
}

pub fn decode_destroy_device_args(dec: &mut Decoder) -> DestroyDeviceArgs {
    DestroyDeviceArgs {
        device: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetDeviceQueueArgs {
    pub device: ServerIdentity,
    pub queue_family_index: u32,
    pub queue_index: u32,
}

pub fn encode_get_device_queue_args(enc: &mut Encoder, args: &GetDeviceQueueArgs) {
    encode_identity(enc, args.device);
    encode_u32(enc, args.queue_family_index);
    encode_u32(enc, args.queue_index);
}

pub fn decode_get_device_queue_args(dec: &mut Decoder) -> GetDeviceQueueArgs {
    GetDeviceQueueArgs {
        device: decode_identity(dec),
        queue_family_index: decode_u32(dec),
        queue_index: decode_u32(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetDeviceQueueReply {
    pub queue: ServerIdentity,
}

pub fn encode_get_device_queue_reply(enc: &mut Encoder, reply: &GetDeviceQueueReply) {
    encode_identity(enc, reply.queue);
}

pub fn decode_get_device_queue_reply(dec: &mut Decoder) -> GetDeviceQueueReply {
    GetDeviceQueueReply {
        queue: decode_identity(dec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_device_args_round_trip() {
        let args = CreateDeviceArgs {
            physical_device: ServerIdentity(1),
            queue_create_infos: vec![QueueCreateInfo {
                queue_family_index: 0,
                queue_priorities: vec![1000],
            }],
            enabled_extensions: vec![],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_create_device_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_create_device_args(&mut dec), args);
    }

    #[test]
    fn get_device_queue_round_trips() {
        let args = GetDeviceQueueArgs {
            device: ServerIdentity(4),
            queue_family_index: 0,
            queue_index: 0,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_get_device_queue_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_get_device_queue_args(&mut dec), args);
    }
}
