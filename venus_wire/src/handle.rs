//! Server-side object identities.
//!
//! The wire never carries a client-visible handle; it carries a
//! [`ServerIdentity`], a bare integer the server mints when it creates the
//! real Vulkan object. Client-side handle allocation lives in
//! `venus_registry`, one layer up, since the wire codec itself has no
//! opinion on how the client names its own objects.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServerIdentity(pub u64);

impl ServerIdentity {
    pub const NULL: ServerIdentity = ServerIdentity(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// The object-category tag carried alongside a bare identity so both ends
/// agree on which table it names. Values are stable across the wire and
/// must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ObjectCategory {
    Instance = 1,
    PhysicalDevice = 2,
    Device = 3,
    Queue = 4,
    CommandPool = 5,
    CommandBuffer = 6,
    Buffer = 7,
    Image = 8,
    DeviceMemory = 9,
    Fence = 10,
    Semaphore = 11,
    Event = 12,
    QueryPool = 13,
}

impl ObjectCategory {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Instance,
            2 => Self::PhysicalDevice,
            3 => Self::Device,
            4 => Self::Queue,
            5 => Self::CommandPool,
            6 => Self::CommandBuffer,
            7 => Self::Buffer,
            8 => Self::Image,
            9 => Self::DeviceMemory,
            10 => Self::Fence,
            11 => Self::Semaphore,
            12 => Self::Event,
            13 => Self::QueryPool,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips_through_bytes() {
        let id = ServerIdentity(0xdead_beef_cafe_f00d);
        assert_eq!(ServerIdentity::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn null_identity_is_zero() {
        assert!(ServerIdentity::NULL.is_null());
        assert!(!ServerIdentity(1).is_null());
    }

    #[test]
    fn category_round_trips_through_u32() {
        for category in [
            ObjectCategory::Instance,
            ObjectCategory::Device,
            ObjectCategory::QueryPool,
        ] {
            let raw = category as u32;
            assert_eq!(ObjectCategory::from_u32(raw).unwrap() as u32, raw);
        }
        assert!(ObjectCategory::from_u32(0).is_none());
    }
}
