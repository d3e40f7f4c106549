//! Command pool / command buffer lifecycle and recording.
//!
//! `vkBeginCommandBuffer`/`vkEndCommandBuffer`/`vkResetCommandBuffer`/
//! `vkResetCommandPool` carry no reply on the wire: the lifecycle tracker is
//! the authority on whether the transition is legal, so it is validated
//! locally before the fire-and-forget send rather than round-tripped for a
//! `VkResult` the server has no extra information to contribute to.

use venus_registry::{Buffer, ClientKey, CommandBuffer, CommandBufferRecord, CommandBufferState, CommandPool, Device};
use venus_wire::command::{CommandFlags, CommandId};
use venus_wire::commands::lifecycle::*;
use venus_wire::ServerIdentity;

use crate::{invalid_usage, vk_result_from_i32, Driver, DriverError, Result};

impl Driver {
    /// Reports the lifecycle tracker's current view of a command buffer,
    /// for application code (and tests) that want to observe the state
    /// machine directly rather than infer it from a call's success.
    pub fn command_buffer_state(&self, command_buffer: ClientKey<CommandBuffer>) -> Result<CommandBufferState> {
        Ok(self
            .registry
            .lifecycle
            .lock()
            .command_buffer(command_buffer)
            .map_err(invalid_usage)?
            .state)
    }

    pub fn create_command_pool(&self, device: ClientKey<Device>, queue_family_index: u32, flags: u32) -> Result<ClientKey<CommandPool>> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::CREATE_COMMAND_POOL,
            CommandFlags::empty(),
            |enc| {
                encode_create_command_pool_args(
                    enc,
                    &CreateCommandPoolArgs {
                        device: identity,
                        queue_family_index,
                        flags,
                    },
                )
            },
            decode_create_command_pool_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_command_pool_key();
        self.registry.lifecycle.lock().insert_pool(
            key,
            venus_registry::CommandPoolRecord {
                device,
                server_identity: reply.command_pool,
                command_buffers: Vec::new(),
            },
        );
        Ok(key)
    }

    pub fn destroy_command_pool(&self, device: ClientKey<Device>, pool: ClientKey<CommandPool>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let pool_identity = self.registry.lifecycle.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::DESTROY_COMMAND_POOL, CommandFlags::empty(), |enc| {
            encode_destroy_command_pool_args(
                enc,
                &DestroyCommandPoolArgs {
                    device: device_identity,
                    command_pool: pool_identity,
                },
            )
        })?;
        self.registry.lifecycle.lock().remove_pool(pool);
        Ok(())
    }

    pub fn reset_command_pool(&self, device: ClientKey<Device>, pool: ClientKey<CommandPool>, flags: u32) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let pool_identity = self.registry.lifecycle.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::RESET_COMMAND_POOL, CommandFlags::empty(), |enc| {
            encode_reset_command_pool_args(
                enc,
                &ResetCommandPoolArgs {
                    device: device_identity,
                    command_pool: pool_identity,
                    flags,
                },
            )
        })?;
        self.registry.lifecycle.lock().reset_pool(pool).map_err(invalid_usage)
    }

    pub fn allocate_command_buffers(
        &self,
        device: ClientKey<Device>,
        pool: ClientKey<CommandPool>,
        level: u32,
        count: u32,
    ) -> Result<Vec<ClientKey<CommandBuffer>>> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let pool_identity = self.registry.lifecycle.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        let reply = self.ring.call(
            CommandId::ALLOCATE_COMMAND_BUFFERS,
            CommandFlags::empty(),
            |enc| {
                encode_allocate_command_buffers_args(
                    enc,
                    &AllocateCommandBuffersArgs {
                        device: device_identity,
                        command_pool: pool_identity,
                        level,
                        count,
                    },
                )
            },
            decode_allocate_command_buffers_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let mut lifecycle = self.registry.lifecycle.lock();
        Ok(reply
            .command_buffers
            .into_iter()
            .map(|server_identity| {
                let key = self.registry.allocate_command_buffer_key();
                lifecycle.insert_command_buffer(key, CommandBufferRecord::new(pool, server_identity));
                key
            })
            .collect())
    }

    pub fn free_command_buffers(&self, device: ClientKey<Device>, pool: ClientKey<CommandPool>, buffers: &[ClientKey<CommandBuffer>]) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let args = {
            let lifecycle = self.registry.lifecycle.lock();
            let pool_identity = lifecycle.pool(pool).map_err(invalid_usage)?.server_identity;
            let command_buffers = buffers
                .iter()
                .map(|cb| lifecycle.command_buffer(*cb).map(|r| r.server_identity))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(invalid_usage)?;
            FreeCommandBuffersArgs {
                device: device_identity,
                command_pool: pool_identity,
                command_buffers,
            }
        };
        self.ring.send(CommandId::FREE_COMMAND_BUFFERS, CommandFlags::empty(), |enc| {
            encode_free_command_buffers_args(enc, &args)
        })?;
        self.registry.lifecycle.lock().free_command_buffers(pool, buffers);
        Ok(())
    }

    pub fn begin_command_buffer(&self, command_buffer: ClientKey<CommandBuffer>, flags: u32) -> Result<()> {
        let identity = self
            .registry
            .lifecycle
            .lock()
            .command_buffer(command_buffer)
            .map_err(invalid_usage)?
            .server_identity;
        self.registry.lifecycle.lock().begin(command_buffer).map_err(invalid_usage)?;
        self.ring.send(CommandId::BEGIN_COMMAND_BUFFER, CommandFlags::empty(), |enc| {
            encode_begin_command_buffer_args(
                enc,
                &BeginCommandBufferArgs {
                    command_buffer: identity,
                    flags,
                },
            )
        })
    }

    pub fn end_command_buffer(&self, command_buffer: ClientKey<CommandBuffer>) -> Result<()> {
        let identity = self
            .registry
            .lifecycle
            .lock()
            .command_buffer(command_buffer)
            .map_err(invalid_usage)?
            .server_identity;
        self.registry.lifecycle.lock().end(command_buffer).map_err(invalid_usage)?;
        self.ring.send(CommandId::END_COMMAND_BUFFER, CommandFlags::empty(), |enc| {
            encode_end_command_buffer_args(enc, &EndCommandBufferArgs { command_buffer: identity })
        })
    }

    pub fn reset_command_buffer(&self, command_buffer: ClientKey<CommandBuffer>, flags: u32) -> Result<()> {
        let identity = self
            .registry
            .lifecycle
            .lock()
            .command_buffer(command_buffer)
            .map_err(invalid_usage)?
            .server_identity;
        self.ring.send(CommandId::RESET_COMMAND_BUFFER, CommandFlags::empty(), |enc| {
            encode_reset_command_buffer_args(
                enc,
                &ResetCommandBufferArgs {
                    command_buffer: identity,
                    flags,
                },
            )
        })?;
        self.registry
            .lifecycle
            .lock()
            .reset_command_buffer(command_buffer)
            .map_err(invalid_usage)
    }

    /// `vkCmdBindDescriptorSets`. Descriptor sets and pipeline layouts are
    /// not tracked as registry objects so their identities pass straight
    /// through. When the lifecycle tracker reports this bind as identical
    /// to the last one at the same `(pipeline_bind_point, first_set)` with
    /// the same `pipeline_layout`, the command is elided entirely rather
    /// than sent for the server to ignore.
    #[allow(clippy::too_many_arguments)]
    pub fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: ClientKey<CommandBuffer>,
        pipeline_bind_point: u32,
        pipeline_layout: ServerIdentity,
        first_set: u32,
        descriptor_sets: &[ServerIdentity],
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        let identity = self
            .registry
            .lifecycle
            .lock()
            .command_buffer(command_buffer)
            .map_err(invalid_usage)?
            .server_identity;
        let is_redundant = self
            .registry
            .lifecycle
            .lock()
            .record_descriptor_bind(command_buffer, pipeline_bind_point, pipeline_layout, first_set, descriptor_sets, dynamic_offsets)
            .map_err(invalid_usage)?;
        if is_redundant {
            return Ok(());
        }
        self.ring.send(CommandId::CMD_BIND_DESCRIPTOR_SETS, CommandFlags::empty(), |enc| {
            encode_cmd_bind_descriptor_sets_args(
                enc,
                &CmdBindDescriptorSetsArgs {
                    command_buffer: identity,
                    pipeline_bind_point,
                    pipeline_layout,
                    first_set,
                    descriptor_sets: descriptor_sets.to_vec(),
                    dynamic_offsets: dynamic_offsets.to_vec(),
                },
            )
        })
    }

    pub fn cmd_copy_buffer(
        &self,
        command_buffer: ClientKey<CommandBuffer>,
        src_buffer: ClientKey<Buffer>,
        dst_buffer: ClientKey<Buffer>,
        regions: Vec<BufferCopyRegion>,
    ) -> Result<()> {
        let command_buffer_identity = self
            .registry
            .lifecycle
            .lock()
            .command_buffer(command_buffer)
            .map_err(invalid_usage)?
            .server_identity;
        self.registry
            .lifecycle
            .lock()
            .require_recording(command_buffer)
            .map_err(invalid_usage)?;
        let (src_identity, dst_identity) = {
            let resource = self.registry.resource.lock();
            (
                resource.buffer(src_buffer).map_err(invalid_usage)?.server_identity,
                resource.buffer(dst_buffer).map_err(invalid_usage)?.server_identity,
            )
        };
        let args = CmdCopyBufferArgs {
            command_buffer: command_buffer_identity,
            src_buffer: src_identity,
            dst_buffer: dst_identity,
            regions,
        };
        self.ring
            .send(CommandId::CMD_COPY_BUFFER, CommandFlags::empty(), |enc| encode_cmd_copy_buffer_args(enc, &args))
    }

    pub fn cmd_fill_buffer(
        &self,
        command_buffer: ClientKey<CommandBuffer>,
        dst_buffer: ClientKey<Buffer>,
        dst_offset: u64,
        size: u64,
        data: u32,
    ) -> Result<()> {
        let command_buffer_identity = self
            .registry
            .lifecycle
            .lock()
            .command_buffer(command_buffer)
            .map_err(invalid_usage)?
            .server_identity;
        self.registry
            .lifecycle
            .lock()
            .require_recording(command_buffer)
            .map_err(invalid_usage)?;
        let dst_identity = self.registry.resource.lock().buffer(dst_buffer).map_err(invalid_usage)?.server_identity;
        let args = CmdFillBufferArgs {
            command_buffer: command_buffer_identity,
            dst_buffer: dst_identity,
            dst_offset,
            size,
            data,
        };
        self.ring
            .send(CommandId::CMD_FILL_BUFFER, CommandFlags::empty(), |enc| encode_cmd_fill_buffer_args(enc, &args))
    }
}
