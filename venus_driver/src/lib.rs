//! The virtual driver facade: the thing application code actually calls.
//! Ties together the object registry, the host-memory shadow, and the
//! submit ring to present something resembling an ICD-shaped API over a
//! remote Vulkan implementation.

pub mod command;
pub mod device;
pub mod instance;
pub mod query;
pub mod resource;
pub mod sync;

use ash::vk;
use parking_lot::Mutex;

use venus_registry::Registry;
use venus_ring::{Ring, RingError};
use venus_shadow::ShadowBufferManager;
use venus_transport::NetworkClient;

/// The three-tier error model: a Vulkan-level failure the
/// application is expected to handle same as a local driver would, a
/// transport-level failure that takes the whole device down with it, and
/// a codec-fatal failure meaning a reply could not be trusted at all. The
/// latter two are distinguished inside [`RingError`]; this enum just keeps
/// the Vulkan tier alongside them without flattening the distinction away.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("vulkan call failed: {0:?}")]
    Vulkan(vk::Result),
    #[error(transparent)]
    Ring(#[from] RingError),
    #[error(transparent)]
    Transfer(#[from] venus_shadow::TransferError),
}

impl DriverError {
    /// `true` once the underlying ring has declared the device lost; every
    /// further call on this driver will fail the same way until the
    /// application recreates its instance.
    pub fn is_device_lost(&self) -> bool {
        matches!(
            self,
            DriverError::Ring(RingError::DeviceLost) | DriverError::Vulkan(vk::Result::ERROR_DEVICE_LOST)
        )
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Folds a local tracker-rule violation (double bind, wrong lifecycle
/// state, unknown handle, out-of-range query) into the Vulkan error tier.
/// A real ICD's validation layer would have caught these before the call
/// reached the driver; here there is no separate layer, so the driver
/// reports them the way it would report any other precondition violation.
pub(crate) fn invalid_usage<E: std::fmt::Display>(err: E) -> DriverError {
    log::warn!("rejecting call: {err}");
    DriverError::Vulkan(vk::Result::ERROR_UNKNOWN)
}

pub(crate) fn vk_result_from_i32(value: i32) -> vk::Result {
    vk::Result::from_raw(value)
}

/// The root handle application code holds. One `Driver` owns one
/// connection's ring, registry and shadow manager; destroying the
/// `VkInstance` it was built around tears down all three.
pub struct Driver {
    pub(crate) registry: Registry,
    pub(crate) ring: Ring,
    pub(crate) shadow: Mutex<ShadowBufferManager>,
}

impl Driver {
    /// Connects to a remote Vulkan implementation at `addr` and returns a
    /// driver ready to have `create_instance` called on it.
    pub fn connect<A: std::net::ToSocketAddrs>(addr: A) -> Result<Self> {
        let client = NetworkClient::connect(addr).map_err(|e| DriverError::Ring(RingError::Transport(e)))?;
        Ok(Self {
            registry: Registry::new(),
            ring: Ring::new(client),
            shadow: Mutex::new(ShadowBufferManager::new()),
        })
    }

    /// Closes the underlying transport without tearing down any local
    /// state. Every call made against this driver afterwards observes the
    /// same device-lost cascade a genuine connection drop would trigger.
    pub fn disconnect(&self) -> Result<()> {
        self.ring.client().disconnect().map_err(|e| DriverError::Ring(RingError::Transport(e)))
    }
}
