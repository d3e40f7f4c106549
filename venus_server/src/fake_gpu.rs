//! The fixed device the server reports back to every client. There is exactly one: a fake discrete GPU with
//! a device-local heap and a host-visible/coherent heap, matching what a
//! thin client needs to pick a memory type for a staging buffer without ever
//! touching real hardware.

use venus_wire::commands::instance::{MemoryHeap, MemoryType, PhysicalDeviceMemoryProperties, PhysicalDeviceProperties};

pub const DEVICE_NAME: &str = "Venus Plus Virtual GPU";
pub const VENDOR_ID: u32 = 0x10DE;
pub const DEVICE_ID: u32 = 0x1234;

/// `VkPhysicalDeviceType::DISCRETE_GPU` by raw value; kept as a plain
/// constant rather than pulling in `ash::vk::PhysicalDeviceType` here since
/// the wire struct stores the type as an untyped `u32`.
pub const DEVICE_TYPE_DISCRETE_GPU: u32 = 2;

const fn make_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 22) | (minor << 12) | patch
}

pub const DRIVER_VERSION: u32 = make_version(1, 0, 0);

/// Queue family 0: graphics, compute and transfer all in one family, four
/// queues deep. Nothing on the wire actually queries queue family layout
/// (there is no `GetPhysicalDeviceQueueFamilyProperties` command in this
/// codec), so this only documents the shape `CreateDeviceArgs` is expected
/// to be consistent with; the server does not itself validate against it.
pub const QUEUE_FAMILY_INDEX: u32 = 0;
pub const QUEUE_COUNT: u32 = 4;
pub const QUEUE_FLAGS_GRAPHICS_COMPUTE_TRANSFER: u32 = 0b0111;

pub const MEMORY_TYPE_DEVICE_LOCAL: u32 = 0;
pub const MEMORY_TYPE_HOST_VISIBLE_COHERENT: u32 = 1;

const DEVICE_LOCAL_BIT: u32 = 0x0000_0001;
const HOST_VISIBLE_BIT: u32 = 0x0000_0002;
const HOST_COHERENT_BIT: u32 = 0x0000_0004;

const DEVICE_LOCAL_HEAP_SIZE: u64 = 8 * 1024 * 1024 * 1024;
const HOST_VISIBLE_HEAP_SIZE: u64 = 16 * 1024 * 1024 * 1024;

pub fn physical_device_properties(api_version: u32) -> PhysicalDeviceProperties {
    PhysicalDeviceProperties {
        api_version,
        driver_version: DRIVER_VERSION,
        vendor_id: VENDOR_ID,
        device_id: DEVICE_ID,
        device_type: DEVICE_TYPE_DISCRETE_GPU,
        device_name: DEVICE_NAME.to_string(),
    }
}

pub fn physical_device_memory_properties() -> PhysicalDeviceMemoryProperties {
    PhysicalDeviceMemoryProperties {
        memory_types: vec![
            MemoryType {
                property_flags: DEVICE_LOCAL_BIT,
                heap_index: 0,
            },
            MemoryType {
                property_flags: HOST_VISIBLE_BIT | HOST_COHERENT_BIT,
                heap_index: 1,
            },
        ],
        memory_heaps: vec![
            MemoryHeap {
                size: DEVICE_LOCAL_HEAP_SIZE,
                flags: DEVICE_LOCAL_BIT,
            },
            MemoryHeap {
                size: HOST_VISIBLE_HEAP_SIZE,
                flags: 0,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_the_fixed_device_name() {
        let props = physical_device_properties(venus_wire::VULKAN_XML_REGISTRY_VERSION);
        assert_eq!(props.device_name, "Venus Plus Virtual GPU");
        assert_eq!(props.device_type, DEVICE_TYPE_DISCRETE_GPU);
    }

    #[test]
    fn memory_layout_has_one_device_local_and_one_host_visible_heap() {
        let props = physical_device_memory_properties();
        assert_eq!(props.memory_heaps.len(), 2);
        assert_eq!(props.memory_types[0].heap_index, 0);
        assert_eq!(props.memory_types[1].heap_index, 1);
        assert_ne!(props.memory_types[1].property_flags & HOST_VISIBLE_BIT, 0);
    }
}
