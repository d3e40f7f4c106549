//! Client-visible object handles.
//!
//! `venus_wire` only knows about [`venus_wire::ServerIdentity`], the bare
//! integer the remote side mints. The client driver needs something it can
//! hand back to application code as a `vk::Buffer`-shaped opaque handle
//! *without* fabricating a pointer the real Vulkan loader never backed --
//! `ClientKey<C>` is that something: a counter-allocated id tagged at the
//! type level with the object category it belongs to, so a `ClientKey<Buffer>`
//! can never be passed where a `ClientKey<Image>` is expected.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct ClientKey<C> {
    id: u64,
    _category: PhantomData<fn() -> C>,
}

impl<C> ClientKey<C> {
    fn new(id: u64) -> Self {
        Self {
            id,
            _category: PhantomData,
        }
    }

    pub fn raw(self) -> u64 {
        self.id
    }
}

impl<C> Clone for ClientKey<C> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<C> Copy for ClientKey<C> {}

impl<C> PartialEq for ClientKey<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<C> Eq for ClientKey<C> {}

impl<C> PartialOrd for ClientKey<C> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<C> Ord for ClientKey<C> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl<C> Hash for ClientKey<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<C> fmt::Debug for ClientKey<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientKey({:#x})", self.id)
    }
}

/// Category markers. Zero-sized; they exist purely to parameterise
/// `ClientKey`.
pub struct Instance;
pub struct PhysicalDevice;
pub struct Device;
pub struct Queue;
pub struct CommandPool;
pub struct CommandBuffer;
pub struct Buffer;
pub struct Image;
pub struct DeviceMemory;
pub struct Fence;
pub struct Semaphore;
pub struct Event;
pub struct QueryPool;

/// Monotonic per-category allocator. Ids are never reused within a process,
/// which lets stale keys from a destroyed object be detected by a registry
/// lookup miss rather than by accidentally colliding with a fresh object.
pub struct KeyAllocator<C> {
    next: AtomicU64,
    _category: PhantomData<fn() -> C>,
}

impl<C> KeyAllocator<C> {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            _category: PhantomData,
        }
    }

    pub fn allocate(&self) -> ClientKey<C> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        ClientKey::new(id)
    }
}

impl<C> Default for KeyAllocator<C> {
    fn default() -> Self {
        Self::new()
    }
}
