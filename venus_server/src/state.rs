//! Server-side object tables. There is no client-facing handle
//! indirection on this side of the wire -- a [`ServerIdentity`] is minted
//! here and is the only name an object ever has, so these tables are keyed
//! directly by it rather than through something like `venus_registry`'s
//! `ClientKey`.

use std::collections::HashMap;

use parking_lot::Mutex;

use venus_wire::commands::lifecycle::BufferCopyRegion;
use venus_wire::ServerIdentity;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("unknown object identity {0}")]
    UnknownObject(ServerIdentity),
    #[error("memory {0} is not mapped")]
    NotMapped(ServerIdentity),
    #[error("range [{offset}, {end}) is outside memory {memory} of size {size}")]
    OutOfRange {
        memory: ServerIdentity,
        offset: u64,
        end: u64,
        size: u64,
    },
}

pub type Result<T> = std::result::Result<T, StateError>;

/// Monotonic identity source shared by every object category. A single
/// counter (rather than one per category, the way `venus_registry` keys its
/// client-side handles) keeps every `ServerIdentity` ever minted unique
/// across the whole connection, which is the property the wire protocol
/// itself relies on: a `ServerIdentity` carries no category tag of its own.
#[derive(Default)]
pub struct IdentityAllocator {
    next: Mutex<u64>,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self { next: Mutex::new(1) }
    }

    pub fn allocate(&self) -> ServerIdentity {
        let mut next = self.next.lock();
        let id = ServerIdentity(*next);
        *next += 1;
        id
    }
}

pub struct DeviceEntry {
    pub physical_device: ServerIdentity,
}

pub struct QueueEntry {
    pub device: ServerIdentity,
    pub queue_family_index: u32,
    pub queue_index: u32,
}

pub struct CommandPoolEntry {
    pub device: ServerIdentity,
    pub command_buffers: Vec<ServerIdentity>,
}

/// A single recorded operation inside a command buffer. Descriptor binds and
/// query commands are recorded for completeness but have no observable
/// effect on a fake GPU with no pipelines to bind against; copy and fill are
/// replayed against the byte-backed memory tables at submit time so a
/// round-tripped push/fill/copy/pull actually moves bytes.
#[derive(Clone)]
pub enum RecordedOp {
    CopyBuffer {
        src_buffer: ServerIdentity,
        dst_buffer: ServerIdentity,
        regions: Vec<BufferCopyRegion>,
    },
    FillBuffer {
        dst_buffer: ServerIdentity,
        dst_offset: u64,
        size: u64,
        data: u32,
    },
}

#[derive(Default)]
pub struct CommandBufferEntry {
    pub pool: ServerIdentity,
    pub recorded: Vec<RecordedOp>,
}

pub struct BufferEntry {
    pub device: ServerIdentity,
    pub size: u64,
    pub binding: Option<(ServerIdentity, u64)>,
}

pub struct ImageEntry {
    pub device: ServerIdentity,
    pub binding: Option<(ServerIdentity, u64)>,
}

/// The server's byte-accurate mirror of a `VkDeviceMemory` allocation. This
/// is the thing `venus_shadow`'s push/pull ultimately read and write on this
/// side of the wire, and what `cmd_copy_buffer`/`cmd_fill_buffer` mutate
/// directly at submit time since there is no real GPU underneath to execute
/// them.
pub struct MemoryEntry {
    pub device: ServerIdentity,
    pub data: Vec<u8>,
    pub mapped: bool,
}

pub struct FenceEntry {
    pub device: ServerIdentity,
    pub signaled: bool,
}

pub struct SemaphoreEntry {
    pub device: ServerIdentity,
    pub is_timeline: bool,
    pub value: u64,
}

pub struct EventEntry {
    pub device: ServerIdentity,
    pub set: bool,
}

pub struct QueryPoolEntry {
    pub device: ServerIdentity,
    pub query_count: u32,
    pub results: Vec<u64>,
}

/// All server-side state for one accepted connection. Every category gets
/// its own lock, the same shape `venus_registry::Registry` uses on the
/// client: a command that only touches queues never contends with one
/// tearing down command buffers.
#[derive(Default)]
pub struct ServerState {
    pub ids: IdentityAllocator,
    pub instances: Mutex<HashMap<ServerIdentity, ()>>,
    pub physical_devices: Mutex<HashMap<ServerIdentity, ()>>,
    pub devices: Mutex<HashMap<ServerIdentity, DeviceEntry>>,
    pub queues: Mutex<HashMap<ServerIdentity, QueueEntry>>,
    pub command_pools: Mutex<HashMap<ServerIdentity, CommandPoolEntry>>,
    pub command_buffers: Mutex<HashMap<ServerIdentity, CommandBufferEntry>>,
    pub buffers: Mutex<HashMap<ServerIdentity, BufferEntry>>,
    pub images: Mutex<HashMap<ServerIdentity, ImageEntry>>,
    pub memory: Mutex<HashMap<ServerIdentity, MemoryEntry>>,
    pub fences: Mutex<HashMap<ServerIdentity, FenceEntry>>,
    pub semaphores: Mutex<HashMap<ServerIdentity, SemaphoreEntry>>,
    pub events: Mutex<HashMap<ServerIdentity, EventEntry>>,
    pub query_pools: Mutex<HashMap<ServerIdentity, QueryPoolEntry>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            ids: IdentityAllocator::new(),
            ..Default::default()
        }
    }

    /// Reads a byte range out of a memory allocation's mirror, for
    /// `READ_MEMORY_DATA`.
    pub fn read_memory(&self, memory: ServerIdentity, offset: u64, size: u64) -> Result<Vec<u8>> {
        let table = self.memory.lock();
        let entry = table.get(&memory).ok_or(StateError::UnknownObject(memory))?;
        let (offset, size) = (offset as usize, size as usize);
        let end = offset.checked_add(size).ok_or(StateError::OutOfRange {
            memory,
            offset: offset as u64,
            end: u64::MAX,
            size: entry.data.len() as u64,
        })?;
        if end > entry.data.len() {
            return Err(StateError::OutOfRange {
                memory,
                offset: offset as u64,
                end: end as u64,
                size: entry.data.len() as u64,
            });
        }
        Ok(entry.data[offset..end].to_vec())
    }

    /// Writes a byte range into a memory allocation's mirror, for
    /// `TRANSFER_MEMORY_DATA`.
    pub fn write_memory(&self, memory: ServerIdentity, offset: u64, data: &[u8]) -> Result<()> {
        let mut table = self.memory.lock();
        let entry = table.get_mut(&memory).ok_or(StateError::UnknownObject(memory))?;
        let offset = offset as usize;
        let end = offset.checked_add(data.len()).ok_or(StateError::OutOfRange {
            memory,
            offset: offset as u64,
            end: u64::MAX,
            size: entry.data.len() as u64,
        })?;
        if end > entry.data.len() {
            return Err(StateError::OutOfRange {
                memory,
                offset: offset as u64,
                end: end as u64,
                size: entry.data.len() as u64,
            });
        }
        entry.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Replays every recorded operation in `command_buffers`, in order, as
    /// `vkQueueSubmit` would execute them. Resolves each buffer handle to
    /// its bound memory through the `buffers`/`memory` tables so a copy or
    /// fill lands in the same bytes a later `READ_MEMORY_DATA` will observe.
    pub fn replay_submission(&self, command_buffers: &[ServerIdentity]) -> Result<()> {
        for cb in command_buffers {
            let ops = {
                let table = self.command_buffers.lock();
                table.get(cb).ok_or(StateError::UnknownObject(*cb))?.recorded.clone()
            };
            for op in ops {
                match op {
                    RecordedOp::CopyBuffer {
                        src_buffer,
                        dst_buffer,
                        regions,
                    } => self.replay_copy_buffer(src_buffer, dst_buffer, &regions)?,
                    RecordedOp::FillBuffer {
                        dst_buffer,
                        dst_offset,
                        size,
                        data,
                    } => self.replay_fill_buffer(dst_buffer, dst_offset, size, data)?,
                }
            }
        }
        Ok(())
    }

    fn resolve_buffer_binding(&self, buffer: ServerIdentity) -> Result<(ServerIdentity, u64)> {
        let buffers = self.buffers.lock();
        let entry = buffers.get(&buffer).ok_or(StateError::UnknownObject(buffer))?;
        entry.binding.ok_or(StateError::UnknownObject(buffer))
    }

    fn replay_copy_buffer(&self, src_buffer: ServerIdentity, dst_buffer: ServerIdentity, regions: &[BufferCopyRegion]) -> Result<()> {
        let (src_memory, src_base) = self.resolve_buffer_binding(src_buffer)?;
        let (dst_memory, dst_base) = self.resolve_buffer_binding(dst_buffer)?;
        for region in regions {
            let bytes = self.read_memory(src_memory, src_base + region.src_offset, region.size)?;
            self.write_memory(dst_memory, dst_base + region.dst_offset, &bytes)?;
        }
        Ok(())
    }

    fn replay_fill_buffer(&self, dst_buffer: ServerIdentity, dst_offset: u64, size: u64, data: u32) -> Result<()> {
        let (dst_memory, dst_base) = self.resolve_buffer_binding(dst_buffer)?;
        let pattern = data.to_le_bytes();
        let mut bytes = Vec::with_capacity(size as usize);
        while (bytes.len() as u64) < size {
            let remaining = (size - bytes.len() as u64) as usize;
            bytes.extend_from_slice(&pattern[..remaining.min(4)]);
        }
        self.write_memory(dst_memory, dst_base + dst_offset, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_allocator_never_repeats() {
        let ids = IdentityAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);
    }

    #[test]
    fn copy_then_read_back_moves_bytes() {
        let state = ServerState::new();
        let memory = ServerIdentity(100);
        state.memory.lock().insert(
            memory,
            MemoryEntry {
                device: ServerIdentity(1),
                data: vec![0u8; 64],
                mapped: false,
            },
        );
        state.write_memory(memory, 0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(state.read_memory(memory, 0, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_read_is_rejected() {
        let state = ServerState::new();
        let memory = ServerIdentity(1);
        state.memory.lock().insert(
            memory,
            MemoryEntry {
                device: ServerIdentity(1),
                data: vec![0u8; 8],
                mapped: false,
            },
        );
        assert!(state.read_memory(memory, 4, 8).is_err());
    }

    #[test]
    fn fill_buffer_replay_writes_repeated_pattern() {
        let state = ServerState::new();
        let memory = ServerIdentity(1);
        let buffer = ServerIdentity(2);
        state.memory.lock().insert(
            memory,
            MemoryEntry {
                device: ServerIdentity(1),
                data: vec![0u8; 16],
                mapped: false,
            },
        );
        state.buffers.lock().insert(
            buffer,
            BufferEntry {
                device: ServerIdentity(1),
                size: 16,
                binding: Some((memory, 0)),
            },
        );
        state.replay_fill_buffer(buffer, 0, 8, 0xAABBCCDD).unwrap();
        let data = state.read_memory(memory, 0, 8).unwrap();
        assert_eq!(&data[0..4], &0xAABBCCDDu32.to_le_bytes());
        assert_eq!(&data[4..8], &0xAABBCCDDu32.to_le_bytes());
    }
}
