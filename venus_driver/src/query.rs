//! Query pool lifecycle and recording.

use venus_registry::{ClientKey, CommandBuffer, Device, QueryPool, QueryPoolRecord};
use venus_wire::command::{CommandFlags, CommandId};
use venus_wire::commands::query::*;

use crate::{invalid_usage, vk_result_from_i32, Driver, DriverError, Result};

impl Driver {
    pub fn create_query_pool(&self, device: ClientKey<Device>, query_type: u32, query_count: u32) -> Result<ClientKey<QueryPool>> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::CREATE_QUERY_POOL,
            CommandFlags::empty(),
            |enc| {
                encode_create_query_pool_args(
                    enc,
                    &CreateQueryPoolArgs {
                        device: identity,
                        query_type,
                        query_count,
                    },
                )
            },
            decode_create_query_pool_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_query_pool_key();
        self.registry.query.lock().insert_pool(
            key,
            QueryPoolRecord {
                device,
                server_identity: reply.query_pool,
                query_type,
                query_count,
            },
        );
        Ok(key)
    }

    pub fn destroy_query_pool(&self, device: ClientKey<Device>, pool: ClientKey<QueryPool>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let pool_identity = self.registry.query.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::DESTROY_QUERY_POOL, CommandFlags::empty(), |enc| {
            encode_destroy_query_pool_args(
                enc,
                &DestroyQueryPoolArgs {
                    device: device_identity,
                    query_pool: pool_identity,
                },
            )
        })?;
        self.registry.query.lock().remove_pool(pool);
        Ok(())
    }

    pub fn cmd_reset_query_pool(
        &self,
        command_buffer: ClientKey<CommandBuffer>,
        pool: ClientKey<QueryPool>,
        first_query: u32,
        query_count: u32,
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
        let pool_identity = self.registry.query.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        self.registry
            .query
            .lock()
            .validate_query_range(pool, first_query, query_count)
            .map_err(invalid_usage)?;
        self.ring.send(CommandId::CMD_RESET_QUERY_POOL, CommandFlags::empty(), |enc| {
            encode_cmd_query_range_args(
                enc,
                &CmdQueryRangeArgs {
                    command_buffer: command_buffer_identity,
                    query_pool: pool_identity,
                    first_query,
                    query_count,
                },
            )
        })
    }

    pub fn cmd_begin_query(&self, command_buffer: ClientKey<CommandBuffer>, pool: ClientKey<QueryPool>, query: u32, flags: u32) -> Result<()> {
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
        let pool_identity = self.registry.query.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        self.registry
            .query
            .lock()
            .validate_query_range(pool, query, 1)
            .map_err(invalid_usage)?;
        self.ring.send(CommandId::CMD_BEGIN_QUERY, CommandFlags::empty(), |enc| {
            encode_cmd_begin_query_args(
                enc,
                &CmdBeginQueryArgs {
                    command_buffer: command_buffer_identity,
                    query_pool: pool_identity,
                    query,
                    flags,
                },
            )
        })
    }

    pub fn cmd_end_query(&self, command_buffer: ClientKey<CommandBuffer>, pool: ClientKey<QueryPool>, query: u32) -> Result<()> {
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
        let pool_identity = self.registry.query.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::CMD_END_QUERY, CommandFlags::empty(), |enc| {
            encode_cmd_end_query_args(
                enc,
                &CmdEndQueryArgs {
                    command_buffer: command_buffer_identity,
                    query_pool: pool_identity,
                    query,
                },
            )
        })
    }

    pub fn get_query_pool_results(
        &self,
        device: ClientKey<Device>,
        pool: ClientKey<QueryPool>,
        first_query: u32,
        query_count: u32,
        flags: u32,
    ) -> Result<Vec<u64>> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let pool_identity = self.registry.query.lock().pool(pool).map_err(invalid_usage)?.server_identity;
        self.registry
            .query
            .lock()
            .validate_query_range(pool, first_query, query_count)
            .map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::GET_QUERY_POOL_RESULTS,
            CommandFlags::empty(),
            |enc| {
                encode_get_query_pool_results_args(
                    enc,
                    &GetQueryPoolResultsArgs {
                        device: device_identity,
                        query_pool: pool_identity,
                        first_query,
                        query_count,
                        flags,
                    },
                )
            },
            decode_get_query_pool_results_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        Ok(reply.values)
    }
}
