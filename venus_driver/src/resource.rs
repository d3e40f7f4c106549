//! Buffer, image and device-memory lifecycle, binding, and host mapping.

use venus_registry::{Buffer, ClientKey, Device, DeviceMemory, Image};
use venus_registry::{Binding, BoundResource, BufferRecord, ImageRecord, MemoryRecord, MemoryRequirements};
use venus_wire::command::{CommandFlags, CommandId};
use venus_wire::commands::resource::*;

use crate::{invalid_usage, vk_result_from_i32, Driver, DriverError, Result};

/// Client-facing mirror of [`MappedMemoryRange`], addressed by registry
/// handle rather than the bare [`venus_wire::ServerIdentity`] the wire
/// struct of the same name carries -- application code never holds one of
/// those directly.
pub struct MappedRange {
    pub memory: ClientKey<DeviceMemory>,
    pub offset: u64,
    pub size: u64,
}

impl Driver {
    /// The registry's current view of what a buffer is bound to, for
    /// callers (and tests) asserting on the resource/memory cross-index
    /// rather than inferring it from a bind or free call's success.
    pub fn buffer_binding(&self, buffer: ClientKey<Buffer>) -> Result<Option<Binding>> {
        Ok(self.registry.resource.lock().buffer(buffer).map_err(invalid_usage)?.binding)
    }

    /// The resources still bound to a memory allocation.
    pub fn memory_bound_resources(&self, memory: ClientKey<DeviceMemory>) -> Result<Vec<BoundResource>> {
        Ok(self
            .registry
            .resource
            .lock()
            .memory(memory)
            .map_err(invalid_usage)?
            .bound_resources
            .clone())
    }

    pub fn create_buffer(&self, device: ClientKey<Device>, size: u64, usage: u32, sharing_mode: u32) -> Result<ClientKey<Buffer>> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::CREATE_BUFFER,
            CommandFlags::empty(),
            |enc| {
                encode_create_buffer_args(
                    enc,
                    &CreateBufferArgs {
                        device: identity,
                        size,
                        usage,
                        sharing_mode,
                    },
                )
            },
            decode_create_buffer_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_buffer_key();
        self.registry.resource.lock().insert_buffer(
            key,
            BufferRecord {
                device,
                server_identity: reply.buffer,
                size,
                usage,
                requirements: None,
                binding: None,
            },
        );
        Ok(key)
    }

    pub fn destroy_buffer(&self, device: ClientKey<Device>, buffer: ClientKey<Buffer>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let buffer_identity = self.registry.resource.lock().buffer(buffer).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::DESTROY_BUFFER, CommandFlags::empty(), |enc| {
            encode_destroy_buffer_args(
                enc,
                &DestroyBufferArgs {
                    device: device_identity,
                    buffer: buffer_identity,
                },
            )
        })?;
        self.registry.resource.lock().remove_buffer(buffer);
        Ok(())
    }

    pub fn create_image(&self, device: ClientKey<Device>, args: CreateImageArgs) -> Result<ClientKey<Image>> {
        let reply = self.ring.call(
            CommandId::CREATE_IMAGE,
            CommandFlags::empty(),
            |enc| encode_create_image_args(enc, &args),
            decode_create_image_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_image_key();
        self.registry.resource.lock().insert_image(
            key,
            ImageRecord {
                device,
                server_identity: reply.image,
                requirements: None,
                binding: None,
            },
        );
        Ok(key)
    }

    pub fn destroy_image(&self, device: ClientKey<Device>, image: ClientKey<Image>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let image_identity = self.registry.resource.lock().image(image).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::DESTROY_IMAGE, CommandFlags::empty(), |enc| {
            encode_destroy_image_args(
                enc,
                &DestroyImageArgs {
                    device: device_identity,
                    image: image_identity,
                },
            )
        })?;
        self.registry.resource.lock().remove_image(image);
        Ok(())
    }

    pub fn get_buffer_memory_requirements(&self, device: ClientKey<Device>, buffer: ClientKey<Buffer>) -> Result<MemoryRequirements> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let buffer_identity = self.registry.resource.lock().buffer(buffer).map_err(invalid_usage)?.server_identity;
        let reply = self.ring.call(
            CommandId::GET_BUFFER_MEMORY_REQUIREMENTS,
            CommandFlags::empty(),
            |enc| {
                encode_get_memory_requirements_args(
                    enc,
                    &GetMemoryRequirementsArgs {
                        device: device_identity,
                        resource: buffer_identity,
                    },
                )
            },
            decode_memory_requirements_reply,
        )?;
        let requirements = MemoryRequirements {
            size: reply.size,
            alignment: reply.alignment,
            memory_type_bits: reply.memory_type_bits,
        };
        self.registry
            .resource
            .lock()
            .set_buffer_requirements(buffer, requirements)
            .map_err(invalid_usage)?;
        Ok(requirements)
    }

    pub fn get_image_memory_requirements(&self, device: ClientKey<Device>, image: ClientKey<Image>) -> Result<MemoryRequirements> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let image_identity = self.registry.resource.lock().image(image).map_err(invalid_usage)?.server_identity;
        let reply = self.ring.call(
            CommandId::GET_IMAGE_MEMORY_REQUIREMENTS,
            CommandFlags::empty(),
            |enc| {
                encode_get_memory_requirements_args(
                    enc,
                    &GetMemoryRequirementsArgs {
                        device: device_identity,
                        resource: image_identity,
                    },
                )
            },
            decode_memory_requirements_reply,
        )?;
        let requirements = MemoryRequirements {
            size: reply.size,
            alignment: reply.alignment,
            memory_type_bits: reply.memory_type_bits,
        };
        self.registry
            .resource
            .lock()
            .set_image_requirements(image, requirements)
            .map_err(invalid_usage)?;
        Ok(requirements)
    }

    pub fn allocate_memory(&self, device: ClientKey<Device>, allocation_size: u64, memory_type_index: u32) -> Result<ClientKey<DeviceMemory>> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::ALLOCATE_MEMORY,
            CommandFlags::empty(),
            |enc| {
                encode_allocate_memory_args(
                    enc,
                    &AllocateMemoryArgs {
                        device: identity,
                        allocation_size,
                        memory_type_index,
                    },
                )
            },
            decode_allocate_memory_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_device_memory_key();
        self.registry.resource.lock().insert_memory(
            key,
            MemoryRecord {
                device,
                server_identity: reply.memory,
                size: allocation_size,
                bound_resources: Vec::new(),
                mapped: false,
            },
        );
        Ok(key)
    }

    /// Frees a memory allocation and clears the `binding` of every buffer
    /// and image that was still bound to it, so a later call to one of
    /// them reports "unbound" rather than pointing at dead memory.
    pub fn free_memory(&self, device: ClientKey<Device>, memory: ClientKey<DeviceMemory>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let memory_identity = self.registry.resource.lock().memory(memory).map_err(invalid_usage)?.server_identity;
        self.shadow.lock().remove_mapping(memory_identity).ok();
        self.ring.send(CommandId::FREE_MEMORY, CommandFlags::empty(), |enc| {
            encode_free_memory_args(
                enc,
                &FreeMemoryArgs {
                    device: device_identity,
                    memory: memory_identity,
                },
            )
        })?;
        let mut resource = self.registry.resource.lock();
        if let Some(record) = resource.remove_memory(memory) {
            for bound in record.bound_resources {
                match bound {
                    BoundResource::Buffer(buffer) => resource.clear_buffer_binding(buffer),
                    BoundResource::Image(image) => resource.clear_image_binding(image),
                }
            }
        }
        Ok(())
    }

    pub fn bind_buffer_memory(
        &self,
        device: ClientKey<Device>,
        buffer: ClientKey<Buffer>,
        memory: ClientKey<DeviceMemory>,
        memory_offset: u64,
    ) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let (buffer_identity, memory_identity) = {
            let resource = self.registry.resource.lock();
            (
                resource.buffer(buffer).map_err(invalid_usage)?.server_identity,
                resource.memory(memory).map_err(invalid_usage)?.server_identity,
            )
        };
        let reply = self.ring.call(
            CommandId::BIND_BUFFER_MEMORY,
            CommandFlags::empty(),
            |enc| {
                encode_bind_resource_memory_args(
                    enc,
                    &BindResourceMemoryArgs {
                        device: device_identity,
                        resource: buffer_identity,
                        memory: memory_identity,
                        memory_offset,
                    },
                )
            },
            decode_resource_result_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        self.registry
            .resource
            .lock()
            .bind_buffer_memory(buffer, memory, memory_offset)
            .map_err(invalid_usage)
    }

    pub fn bind_image_memory(
        &self,
        device: ClientKey<Device>,
        image: ClientKey<Image>,
        memory: ClientKey<DeviceMemory>,
        memory_offset: u64,
    ) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let (image_identity, memory_identity) = {
            let resource = self.registry.resource.lock();
            (
                resource.image(image).map_err(invalid_usage)?.server_identity,
                resource.memory(memory).map_err(invalid_usage)?.server_identity,
            )
        };
        let reply = self.ring.call(
            CommandId::BIND_IMAGE_MEMORY,
            CommandFlags::empty(),
            |enc| {
                encode_bind_resource_memory_args(
                    enc,
                    &BindResourceMemoryArgs {
                        device: device_identity,
                        resource: image_identity,
                        memory: memory_identity,
                        memory_offset,
                    },
                )
            },
            decode_resource_result_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        self.registry
            .resource
            .lock()
            .bind_image_memory(image, memory, memory_offset)
            .map_err(invalid_usage)
    }

    /// Establishes the host-visible shadow for `[offset, offset+size)` and
    /// asks the server to populate it, matching `vkMapMemory` immediately
    /// returning a pointer the application can read stale-but-valid data
    /// from before it writes anything.
    pub fn map_memory(&self, device: ClientKey<Device>, memory: ClientKey<DeviceMemory>, offset: u64, size: u64) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let memory_identity = self.registry.resource.lock().memory(memory).map_err(invalid_usage)?.server_identity;
        self.registry.resource.lock().begin_map(memory).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::MAP_MEMORY,
            CommandFlags::empty(),
            |enc| {
                encode_map_memory_args(
                    enc,
                    &MapMemoryArgs {
                        device: device_identity,
                        memory: memory_identity,
                        offset,
                        size,
                    },
                )
            },
            decode_resource_result_reply,
        )?;
        if reply.result != 0 {
            self.registry.resource.lock().end_map(memory).ok();
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        self.shadow
            .lock()
            .create_mapping(device_identity, memory_identity, size)
            .map_err(invalid_usage)?;
        let data = venus_shadow::pull(&self.ring_client(), device_identity, memory_identity, offset, size)?;
        self.shadow.lock().write_range(memory_identity, 0, &data).map_err(invalid_usage)?;
        Ok(())
    }

    /// Writes into the host-visible shadow of a currently mapped
    /// allocation -- the stand-in, in this remoting architecture, for
    /// writing through the raw pointer `vkMapMemory` would have returned.
    /// Nothing reaches the server until [`Self::flush_mapped_memory_ranges`]
    /// pushes this range.
    pub fn write_mapped_memory(&self, memory: ClientKey<DeviceMemory>, offset: u64, data: &[u8]) -> Result<()> {
        let memory_identity = self.registry.resource.lock().memory(memory).map_err(invalid_usage)?.server_identity;
        self.shadow.lock().write_range(memory_identity, offset, data).map_err(invalid_usage)
    }

    /// Reads back from the host-visible shadow of a currently mapped
    /// allocation, the read-side counterpart of
    /// [`Self::write_mapped_memory`].
    pub fn read_mapped_memory(&self, memory: ClientKey<DeviceMemory>, offset: u64, size: u64) -> Result<Vec<u8>> {
        let memory_identity = self.registry.resource.lock().memory(memory).map_err(invalid_usage)?.server_identity;
        self.shadow.lock().read_range(memory_identity, offset, size).map_err(invalid_usage)
    }

    /// `vkUnmapMemory`. The fake GPU exposes only host-visible+coherent
    /// memory, so every unmap flushes the shadow unconditionally -- without
    /// this, an application that maps, writes, and unmaps without an
    /// explicit `flush_mapped_memory_ranges` call (valid Vulkan for
    /// coherent memory) would silently lose those writes.
    pub fn unmap_memory(&self, device: ClientKey<Device>, memory: ClientKey<DeviceMemory>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let memory_identity = self.registry.resource.lock().memory(memory).map_err(invalid_usage)?.server_identity;
        let data = self.shadow.lock().get_mapping(memory_identity).map_err(invalid_usage)?.to_vec();
        venus_shadow::push(&self.ring_client(), device_identity, memory_identity, 0, &data)?;
        self.ring.send(CommandId::UNMAP_MEMORY, CommandFlags::empty(), |enc| {
            encode_unmap_memory_args(
                enc,
                &UnmapMemoryArgs {
                    device: device_identity,
                    memory: memory_identity,
                },
            )
        })?;
        self.registry.resource.lock().end_map(memory).map_err(invalid_usage)?;
        self.shadow.lock().remove_mapping(memory_identity).ok();
        Ok(())
    }

    /// Pushes the shadow's contents for each range up to the server. This
    /// must complete before any command reading the memory is submitted
    ///.
    pub fn flush_mapped_memory_ranges(&self, device: ClientKey<Device>, ranges: &[MappedRange]) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        for range in ranges {
            let memory_identity = self.registry.resource.lock().memory(range.memory).map_err(invalid_usage)?.server_identity;
            let data = self
                .shadow
                .lock()
                .read_range(memory_identity, range.offset, range.size)
                .map_err(invalid_usage)?;
            venus_shadow::push(&self.ring_client(), device_identity, memory_identity, range.offset, &data)?;
        }
        Ok(())
    }

    /// Pulls fresh server-side contents into the shadow for each range.
    /// Must happen after every command writing the memory has been waited
    /// on (the mirror image of `flush_mapped_memory_ranges`'s contract).
    pub fn invalidate_mapped_memory_ranges(&self, device: ClientKey<Device>, ranges: &[MappedRange]) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        for range in ranges {
            let memory_identity = self.registry.resource.lock().memory(range.memory).map_err(invalid_usage)?.server_identity;
            let data = venus_shadow::pull(&self.ring_client(), device_identity, memory_identity, range.offset, range.size)?;
            self.shadow
                .lock()
                .write_range(memory_identity, range.offset, &data)
                .map_err(invalid_usage)?;
        }
        Ok(())
    }

    fn ring_client(&self) -> &venus_transport::NetworkClient {
        self.ring.client()
    }
}
