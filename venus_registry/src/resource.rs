//! Buffer, image and device-memory tracking.
//!
//! Three maps, one cross-index: binding a buffer or image to memory records
//! the binding on the resource *and* appends a back-reference on the memory
//! record, so freeing memory can walk every resource still bound to it
//! without a linear scan.

use std::collections::HashMap;

use venus_wire::ServerIdentity;

use crate::key::{Buffer, ClientKey, Device, DeviceMemory, Image};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundResource {
    Buffer(ClientKey<Buffer>),
    Image(ClientKey<Image>),
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
    pub memory_type_bits: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub memory: ClientKey<DeviceMemory>,
    pub offset: u64,
}

pub struct BufferRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub size: u64,
    pub usage: u32,
    pub requirements: Option<MemoryRequirements>,
    pub binding: Option<Binding>,
}

pub struct ImageRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub requirements: Option<MemoryRequirements>,
    pub binding: Option<Binding>,
}

pub struct MemoryRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub size: u64,
    pub bound_resources: Vec<BoundResource>,
    pub mapped: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("unknown buffer handle")]
    UnknownBuffer,
    #[error("unknown image handle")]
    UnknownImage,
    #[error("unknown device memory handle")]
    UnknownMemory,
    #[error("resource is already bound to memory")]
    AlreadyBound,
    #[error("memory is already mapped")]
    AlreadyMapped,
    #[error("memory is not mapped")]
    NotMapped,
}

#[derive(Default)]
pub struct ResourceTracker {
    buffers: HashMap<ClientKey<Buffer>, BufferRecord>,
    images: HashMap<ClientKey<Image>, ImageRecord>,
    memories: HashMap<ClientKey<DeviceMemory>, MemoryRecord>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_buffer(&mut self, key: ClientKey<Buffer>, record: BufferRecord) {
        self.buffers.insert(key, record);
    }

    pub fn insert_image(&mut self, key: ClientKey<Image>, record: ImageRecord) {
        self.images.insert(key, record);
    }

    pub fn insert_memory(&mut self, key: ClientKey<DeviceMemory>, record: MemoryRecord) {
        self.memories.insert(key, record);
    }

    pub fn buffer(&self, key: ClientKey<Buffer>) -> Result<&BufferRecord, ResourceError> {
        self.buffers.get(&key).ok_or(ResourceError::UnknownBuffer)
    }

    pub fn image(&self, key: ClientKey<Image>) -> Result<&ImageRecord, ResourceError> {
        self.images.get(&key).ok_or(ResourceError::UnknownImage)
    }

    pub fn memory(&self, key: ClientKey<DeviceMemory>) -> Result<&MemoryRecord, ResourceError> {
        self.memories.get(&key).ok_or(ResourceError::UnknownMemory)
    }

    pub fn set_buffer_requirements(
        &mut self,
        key: ClientKey<Buffer>,
        requirements: MemoryRequirements,
    ) -> Result<(), ResourceError> {
        let record = self.buffers.get_mut(&key).ok_or(ResourceError::UnknownBuffer)?;
        record.requirements = Some(requirements);
        Ok(())
    }

    pub fn set_image_requirements(
        &mut self,
        key: ClientKey<Image>,
        requirements: MemoryRequirements,
    ) -> Result<(), ResourceError> {
        let record = self.images.get_mut(&key).ok_or(ResourceError::UnknownImage)?;
        record.requirements = Some(requirements);
        Ok(())
    }

    pub fn bind_buffer_memory(
        &mut self,
        buffer: ClientKey<Buffer>,
        memory: ClientKey<DeviceMemory>,
        offset: u64,
    ) -> Result<(), ResourceError> {
        {
            let record = self.buffers.get_mut(&buffer).ok_or(ResourceError::UnknownBuffer)?;
            if record.binding.is_some() {
                return Err(ResourceError::AlreadyBound);
            }
            record.binding = Some(Binding { memory, offset });
        }
        let mem_record = self.memories.get_mut(&memory).ok_or(ResourceError::UnknownMemory)?;
        mem_record.bound_resources.push(BoundResource::Buffer(buffer));
        Ok(())
    }

    pub fn bind_image_memory(
        &mut self,
        image: ClientKey<Image>,
        memory: ClientKey<DeviceMemory>,
        offset: u64,
    ) -> Result<(), ResourceError> {
        {
            let record = self.images.get_mut(&image).ok_or(ResourceError::UnknownImage)?;
            if record.binding.is_some() {
                return Err(ResourceError::AlreadyBound);
            }
            record.binding = Some(Binding { memory, offset });
        }
        let mem_record = self.memories.get_mut(&memory).ok_or(ResourceError::UnknownMemory)?;
        mem_record.bound_resources.push(BoundResource::Image(image));
        Ok(())
    }

    pub fn begin_map(&mut self, memory: ClientKey<DeviceMemory>) -> Result<(), ResourceError> {
        let record = self.memories.get_mut(&memory).ok_or(ResourceError::UnknownMemory)?;
        if record.mapped {
            return Err(ResourceError::AlreadyMapped);
        }
        record.mapped = true;
        Ok(())
    }

    pub fn end_map(&mut self, memory: ClientKey<DeviceMemory>) -> Result<(), ResourceError> {
        let record = self.memories.get_mut(&memory).ok_or(ResourceError::UnknownMemory)?;
        if !record.mapped {
            return Err(ResourceError::NotMapped);
        }
        record.mapped = false;
        Ok(())
    }

    pub fn remove_buffer(&mut self, key: ClientKey<Buffer>) -> Option<BufferRecord> {
        self.buffers.remove(&key)
    }

    pub fn remove_image(&mut self, key: ClientKey<Image>) -> Option<ImageRecord> {
        self.images.remove(&key)
    }

    /// Clears a buffer's `binding` without touching the memory side of the
    /// cross-index -- used by the caller once it has already walked a
    /// freed memory's `bound_resources`.
    pub fn clear_buffer_binding(&mut self, key: ClientKey<Buffer>) {
        if let Some(record) = self.buffers.get_mut(&key) {
            record.binding = None;
        }
    }

    /// Clears an image's `binding`, the image counterpart of
    /// [`Self::clear_buffer_binding`].
    pub fn clear_image_binding(&mut self, key: ClientKey<Image>) {
        if let Some(record) = self.images.get_mut(&key) {
            record.binding = None;
        }
    }

    /// Frees a memory record, returning the resources that were still bound
    /// to it. The caller (the top-level `Registry`) is responsible for
    /// clearing those resources' own `binding` fields via
    /// [`Self::clear_buffer_binding`]/[`Self::clear_image_binding`] -- this
    /// tracker only owns the memory side of the cross-index.
    pub fn remove_memory(&mut self, key: ClientKey<DeviceMemory>) -> Option<MemoryRecord> {
        self.memories.remove(&key)
    }

    pub fn remove_device(&mut self, device: ClientKey<Device>) {
        self.buffers.retain(|_, record| record.device != device);
        self.images.retain(|_, record| record.device != device);
        self.memories.retain(|_, record| record.device != device);
    }
}
