//! `vkCreateInstance` / physical device enumeration and property queries.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;
use crate::primitives::*;

/// `vkEnumerateInstanceVersion` takes no arguments; this is a zero-sized
/// marker only so the command has a symmetrical encode/decode pair like
/// every other command in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerateInstanceVersionArgs;

pub fn encode_enumerate_instance_version_args(_enc: &mut Encoder, _args: &EnumerateInstanceVersionArgs) {}

pub fn decode_enumerate_instance_version_args(_dec: &mut Decoder) -> EnumerateInstanceVersionArgs {
    EnumerateInstanceVersionArgs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerateInstanceVersionReply {
    pub result: i32,
    pub api_version: u32,
}

pub fn encode_enumerate_instance_version_reply(enc: &mut Encoder, reply: &EnumerateInstanceVersionReply) {
    encode_i32(enc, reply.result);
    encode_u32(enc, reply.api_version);
}

pub fn decode_enumerate_instance_version_reply(dec: &mut Decoder) -> EnumerateInstanceVersionReply {
    EnumerateInstanceVersionReply {
        result: decode_i32(dec),
        api_version: decode_u32(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstanceArgs {
    pub api_version: u32,
    pub application_name: String,
    pub enabled_extensions: Vec<String>,
}

pub fn encode_create_instance_args(enc: &mut Encoder, args: &CreateInstanceArgs) {
    encode_u32(enc, args.api_version);
    encode_string(enc, &args.application_name);
    encode_u32(enc, args.enabled_extensions.len() as u32);
    for ext in &args.enabled_extensions {
        encode_string(enc, ext);
    }
}

pub fn decode_create_instance_args(dec: &mut Decoder) -> CreateInstanceArgs {
    let api_version = decode_u32(dec);
    let application_name = decode_string(dec);
    let count = decode_u32(dec) as usize;
    let mut enabled_extensions = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        enabled_extensions.push(decode_string(dec));
        if dec.is_fatal() {
            break;
        }
    }
    CreateInstanceArgs {
        api_version,
        application_name,
        enabled_extensions,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateInstanceReply {
    pub result: i32,
    pub instance: ServerIdentity,
}

pub fn encode_create_instance_reply(enc: &mut Encoder, reply: &CreateInstanceReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.instance);
}

pub fn decode_create_instance_reply(dec: &mut Decoder) -> CreateInstanceReply {
    CreateInstanceReply {
        result: decode_i32(dec),
        instance: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyInstanceArgs {
    pub instance: ServerIdentity,
}

pub fn encode_destroy_instance_args(enc: &mut Encoder, args: &DestroyInstanceArgs) {
    encode_identity(enc, args.instance);
}

pub fn decode_destroy_instance_args(dec: &mut Decoder) -> DestroyInstanceArgs {
    DestroyInstanceArgs {
        instance: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumeratePhysicalDevicesArgs {
    pub instance: ServerIdentity,
}

pub fn encode_enumerate_physical_devices_args(enc: &mut Encoder, args: &EnumeratePhysicalDevicesArgs) {
    encode_identity(enc, args.instance);
}

pub fn decode_enumerate_physical_devices_args(dec: &mut Decoder) -> EnumeratePhysicalDevicesArgs {
    EnumeratePhysicalDevicesArgs {
        instance: decode_identity(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratePhysicalDevicesReply {
    pub result: i32,
    pub physical_devices: Vec<ServerIdentity>,
}

pub fn encode_enumerate_physical_devices_reply(enc: &mut Encoder, reply: &EnumeratePhysicalDevicesReply) {
    encode_i32(enc, reply.result);
    encode_identity_array(enc, &reply.physical_devices);
}

pub fn decode_enumerate_physical_devices_reply(dec: &mut Decoder) -> EnumeratePhysicalDevicesReply {
    EnumeratePhysicalDevicesReply {
        result: decode_i32(dec),
        physical_devices: decode_identity_array(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetPhysicalDevicePropertiesArgs {
    pub physical_device: ServerIdentity,
}

pub fn encode_get_physical_device_properties_args(enc: &mut Encoder, args: &GetPhysicalDevicePropertiesArgs) {
    encode_identity(enc, args.physical_device);
}

pub fn decode_get_physical_device_properties_args(dec: &mut Decoder) -> GetPhysicalDevicePropertiesArgs {
    GetPhysicalDevicePropertiesArgs {
        physical_device: decode_identity(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceProperties {
    pub api_version: u32,
    pub driver_version: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub device_type: u32,
    pub device_name: String,
}

pub fn encode_physical_device_properties(enc: &mut Encoder, props: &PhysicalDeviceProperties) {
    encode_u32(enc, props.api_version);
    encode_u32(enc, props.driver_version);
    encode_u32(enc, props.vendor_id);
    encode_u32(enc, props.device_id);
    encode_u32(enc, props.device_type);
    encode_string(enc, &props.device_name);
}

pub fn decode_physical_device_properties(dec: &mut Decoder) -> PhysicalDeviceProperties {
    PhysicalDeviceProperties {
        api_version: decode_u32(dec),
        driver_version: decode_u32(dec),
        vendor_id: decode_u32(dec),
        device_id: decode_u32(dec),
        device_type: decode_u32(dec),
        device_name: decode_string(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryHeap {
    pub size: u64,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryType {
    pub property_flags: u32,
    pub heap_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceMemoryProperties {
    pub memory_types: Vec<MemoryType>,
    pub memory_heaps: Vec<MemoryHeap>,
}

pub fn encode_physical_device_memory_properties(enc: &mut Encoder, props: &PhysicalDeviceMemoryProperties) {
    encode_u32(enc, props.memory_types.len() as u32);
    for mt in &props.memory_types {
        encode_u32(enc, mt.property_flags);
        encode_u32(enc, mt.heap_index);
    }
    encode_u32(enc, props.memory_heaps.len() as u32);
    for heap in &props.memory_heaps {
        encode_u64(enc, heap.size);
        encode_u32(enc, heap.flags);
    }
}

pub fn decode_physical_device_memory_properties(dec: &mut Decoder) -> PhysicalDeviceMemoryProperties {
    let type_count = decode_u32(dec) as usize;
    let mut memory_types = Vec::with_capacity(type_count.min(32));
    for _ in 0..type_count {
        memory_types.push(MemoryType {
            property_flags: decode_u32(dec),
            heap_index: decode_u32(dec),
        });
        if dec.is_fatal() {
            break;
        }
    }
    let heap_count = decode_u32(dec) as usize;
    let mut memory_heaps = Vec::with_capacity(heap_count.min(16));
    for _ in 0..heap_count {
        memory_heaps.push(MemoryHeap {
            size: decode_u64(dec),
            flags: decode_u32(dec),
        });
        if dec.is_fatal() {
            break;
        }
    }
    PhysicalDeviceMemoryProperties {
        memory_types,
        memory_heaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerate_instance_version_reply_round_trips() {
        let reply = EnumerateInstanceVersionReply {
            result: 0,
            api_version: crate::VULKAN_XML_REGISTRY_VERSION,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_enumerate_instance_version_reply(&mut enc, &reply);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_enumerate_instance_version_reply(&mut dec), reply);
    }

    #[test]
    fn create_instance_args_round_trip() {
        let args = CreateInstanceArgs {
            api_version: crate::VULKAN_XML_REGISTRY_VERSION,
            application_name: "venus-client".into(),
            enabled_extensions: vec!["VK_KHR_surface".into()],
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_create_instance_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_create_instance_args(&mut dec), args);
        assert!(!dec.is_fatal());
    }

    #[test]
    fn physical_device_properties_round_trip() {
        let props = PhysicalDeviceProperties {
            api_version: crate::VULKAN_XML_REGISTRY_VERSION,
            driver_version: 1,
            vendor_id: 0xFFFF,
            device_id: 1,
            device_type: 2,
            device_name: "Venus Plus Virtual GPU".into(),
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_physical_device_properties(&mut enc, &props);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_physical_device_properties(&mut dec), props);
    }
}
