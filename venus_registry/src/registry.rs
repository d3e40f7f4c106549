//! Top-level object registry.
//!
//! One `parking_lot::Mutex` per tracker rather than one big lock: a
//! `vkCmdCopyBuffer` only ever touches the resource tracker, and serialising
//! it behind query-pool or sync traffic would be pure contention. The one
//! rule every call site must respect is the fixed lock order used by
//! cascading teardown: lifecycle, then sync, then resource, then query,
//! then the device/instance tables. `venus_driver` additionally slots the
//! shadow-mapping lock (owned by `venus_shadow`, a sibling crate this one
//! doesn't depend on) between query and the device/instance tables when it
//! tears down a device end to end.

use std::collections::HashMap;

use parking_lot::Mutex;
use venus_wire::ServerIdentity;

use crate::key::{
    ClientKey, CommandBuffer, CommandPool, Device, DeviceMemory, Event, Fence, Image, Instance, KeyAllocator,
    PhysicalDevice, Queue, QueryPool as QueryPoolCategory, Semaphore,
};
use crate::lifecycle::LifecycleTracker;
use crate::query::QueryTracker;
use crate::resource::ResourceTracker;
use crate::sync::SyncTracker;
use crate::Buffer;

pub struct InstanceRecord {
    pub server_identity: ServerIdentity,
}

pub struct PhysicalDeviceRecord {
    pub instance: ClientKey<Instance>,
    pub server_identity: ServerIdentity,
}

pub struct DeviceRecord {
    pub physical_device: ClientKey<PhysicalDevice>,
    pub server_identity: ServerIdentity,
}

pub struct QueueRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub queue_family_index: u32,
    pub queue_index: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown instance handle")]
    UnknownInstance,
    #[error("unknown physical device handle")]
    UnknownPhysicalDevice,
    #[error("unknown device handle")]
    UnknownDevice,
    #[error("unknown queue handle")]
    UnknownQueue,
}

#[derive(Default)]
struct KeyAllocators {
    instances: KeyAllocator<Instance>,
    physical_devices: KeyAllocator<PhysicalDevice>,
    devices: KeyAllocator<Device>,
    queues: KeyAllocator<Queue>,
    command_pools: KeyAllocator<CommandPool>,
    command_buffers: KeyAllocator<CommandBuffer>,
    buffers: KeyAllocator<Buffer>,
    images: KeyAllocator<Image>,
    device_memories: KeyAllocator<DeviceMemory>,
    fences: KeyAllocator<Fence>,
    semaphores: KeyAllocator<Semaphore>,
    events: KeyAllocator<Event>,
    query_pools: KeyAllocator<QueryPoolCategory>,
}

pub struct Registry {
    keys: KeyAllocators,
    instances: Mutex<HashMap<ClientKey<Instance>, InstanceRecord>>,
    physical_devices: Mutex<HashMap<ClientKey<PhysicalDevice>, PhysicalDeviceRecord>>,
    devices: Mutex<HashMap<ClientKey<Device>, DeviceRecord>>,
    queues: Mutex<HashMap<ClientKey<Queue>, QueueRecord>>,
    pub lifecycle: Mutex<LifecycleTracker>,
    pub sync: Mutex<SyncTracker>,
    pub resource: Mutex<ResourceTracker>,
    pub query: Mutex<QueryTracker>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            keys: KeyAllocators::default(),
            instances: Mutex::new(HashMap::new()),
            physical_devices: Mutex::new(HashMap::new()),
            devices: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(LifecycleTracker::new()),
            sync: Mutex::new(SyncTracker::new()),
            resource: Mutex::new(ResourceTracker::new()),
            query: Mutex::new(QueryTracker::new()),
        }
    }

    pub fn allocate_instance_key(&self) -> ClientKey<Instance> {
        self.keys.instances.allocate()
    }
    pub fn allocate_physical_device_key(&self) -> ClientKey<PhysicalDevice> {
        self.keys.physical_devices.allocate()
    }
    pub fn allocate_device_key(&self) -> ClientKey<Device> {
        self.keys.devices.allocate()
    }
    pub fn allocate_queue_key(&self) -> ClientKey<Queue> {
        self.keys.queues.allocate()
    }
    pub fn allocate_command_pool_key(&self) -> ClientKey<CommandPool> {
        self.keys.command_pools.allocate()
    }
    pub fn allocate_command_buffer_key(&self) -> ClientKey<CommandBuffer> {
        self.keys.command_buffers.allocate()
    }
    pub fn allocate_buffer_key(&self) -> ClientKey<Buffer> {
        self.keys.buffers.allocate()
    }
    pub fn allocate_image_key(&self) -> ClientKey<Image> {
        self.keys.images.allocate()
    }
    pub fn allocate_device_memory_key(&self) -> ClientKey<DeviceMemory> {
        self.keys.device_memories.allocate()
    }
    pub fn allocate_fence_key(&self) -> ClientKey<Fence> {
        self.keys.fences.allocate()
    }
    pub fn allocate_semaphore_key(&self) -> ClientKey<Semaphore> {
        self.keys.semaphores.allocate()
    }
    pub fn allocate_event_key(&self) -> ClientKey<Event> {
        self.keys.events.allocate()
    }
    pub fn allocate_query_pool_key(&self) -> ClientKey<QueryPoolCategory> {
        self.keys.query_pools.allocate()
    }

    pub fn insert_instance(&self, key: ClientKey<Instance>, record: InstanceRecord) {
        self.instances.lock().insert(key, record);
    }

    pub fn instance_identity(&self, key: ClientKey<Instance>) -> Result<ServerIdentity, RegistryError> {
        self.instances
            .lock()
            .get(&key)
            .map(|r| r.server_identity)
            .ok_or(RegistryError::UnknownInstance)
    }

    pub fn insert_physical_device(&self, key: ClientKey<PhysicalDevice>, record: PhysicalDeviceRecord) {
        self.physical_devices.lock().insert(key, record);
    }

    pub fn physical_device_identity(&self, key: ClientKey<PhysicalDevice>) -> Result<ServerIdentity, RegistryError> {
        self.physical_devices
            .lock()
            .get(&key)
            .map(|r| r.server_identity)
            .ok_or(RegistryError::UnknownPhysicalDevice)
    }

    pub fn insert_device(&self, key: ClientKey<Device>, record: DeviceRecord) {
        self.devices.lock().insert(key, record);
    }

    pub fn device_identity(&self, key: ClientKey<Device>) -> Result<ServerIdentity, RegistryError> {
        self.devices
            .lock()
            .get(&key)
            .map(|r| r.server_identity)
            .ok_or(RegistryError::UnknownDevice)
    }

    pub fn insert_queue(&self, key: ClientKey<Queue>, record: QueueRecord) {
        self.queues.lock().insert(key, record);
    }

    pub fn queue_identity(&self, key: ClientKey<Queue>) -> Result<ServerIdentity, RegistryError> {
        self.queues
            .lock()
            .get(&key)
            .map(|r| r.server_identity)
            .ok_or(RegistryError::UnknownQueue)
    }

    pub fn remove_instance(&self, key: ClientKey<Instance>) -> Option<InstanceRecord> {
        self.instances.lock().remove(&key)
    }

    /// Tears down every object descended from `device` across the four
    /// per-device trackers, in the fixed lock order (lifecycle, sync,
    /// resource, query), then drops the device table entry itself. Queues
    /// belonging to the device are removed last since nothing else holds a
    /// back-reference to them.
    pub fn remove_device(&self, device: ClientKey<Device>) {
        self.lifecycle.lock().remove_device(device);
        self.sync.lock().remove_device(device);
        self.resource.lock().remove_device(device);
        self.query.lock().remove_device(device);
        self.queues.lock().retain(|_, record| record.device != device);
        self.devices.lock().remove(&device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_teardown_cascades_to_trackers() {
        let registry = Registry::new();
        let device = registry.allocate_device_key();
        registry.insert_device(
            device,
            DeviceRecord {
                physical_device: registry.allocate_physical_device_key(),
                server_identity: ServerIdentity(1),
            },
        );
        let queue = registry.allocate_queue_key();
        registry.insert_queue(
            queue,
            QueueRecord {
                device,
                server_identity: ServerIdentity(2),
                queue_family_index: 0,
                queue_index: 0,
            },
        );
        registry.remove_device(device);
        assert!(registry.device_identity(device).is_err());
        assert!(registry.queue_identity(queue).is_err());
    }

    #[test]
    fn unknown_keys_report_errors_not_panics() {
        let registry = Registry::new();
        let device = registry.allocate_device_key();
        assert!(matches!(registry.device_identity(device), Err(RegistryError::UnknownDevice)));
    }
}
