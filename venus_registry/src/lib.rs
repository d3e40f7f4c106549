//! Client-side object registry: the authoritative map from the opaque
//! handles application code holds to the server identities `venus_wire`
//! puts on the wire, plus the per-category trackers that give the driver
//! enough local state to validate calls before round-tripping them.

pub mod key;
pub mod lifecycle;
pub mod query;
pub mod registry;
pub mod resource;
pub mod sync;

pub use key::{
    Buffer, ClientKey, CommandBuffer, CommandPool, Device, DeviceMemory, Event, Fence, Image, Instance,
    KeyAllocator, PhysicalDevice, Queue, QueryPool, Semaphore,
};
pub use lifecycle::{CommandBufferRecord, CommandBufferState, CommandPoolRecord, LifecycleError, LifecycleTracker};
pub use query::{QueryError, QueryPoolRecord, QueryTracker};
pub use registry::{DeviceRecord, InstanceRecord, PhysicalDeviceRecord, QueueRecord, Registry, RegistryError};
pub use resource::{Binding, BoundResource, BufferRecord, ImageRecord, MemoryRecord, MemoryRequirements, ResourceError};
pub use sync::{EventRecord, FenceRecord, SemaphoreRecord, SyncError, SyncTracker};
