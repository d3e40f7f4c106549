//! Command dispatcher: the server half of the wire contract `venus_ring`
//! drives from the client. One call to [`dispatch`] decodes exactly one
//! command, mutates [`ServerState`] accordingly, and returns the reply bytes
//! to send back -- or `None` when the command carries none, matching the
//! `Fn(&[u8]) -> Option<Vec<u8>>` handler shape `venus_transport::NetworkServer`
//! expects so a fire-and-forget command never gets an (unread) reply frame.

use ash::vk;
use log::warn;

use venus_wire::command::{CommandFlags, CommandHeader, CommandId};
use venus_wire::commands::device::*;
use venus_wire::commands::instance::*;
use venus_wire::commands::lifecycle::*;
use venus_wire::commands::memory_transfer::*;
use venus_wire::commands::query::*;
use venus_wire::commands::resource::*;
use venus_wire::commands::sync::*;
use venus_wire::{Decoder, Encoder, ServerIdentity};

use crate::fake_gpu;
use crate::state::{
    BufferEntry, CommandBufferEntry, CommandPoolEntry, DeviceEntry, EventEntry, FenceEntry, ImageEntry, MemoryEntry, QueryPoolEntry,
    QueueEntry, RecordedOp, SemaphoreEntry, ServerState, StateError,
};

const SUCCESS: i32 = 0; // vk::Result::SUCCESS.as_raw(), spelled out since every reply stores a bare i32.

fn encode_reply(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
    let mut enc = Encoder::dynamic();
    enc.acquire();
    f(&mut enc);
    enc.data().to_vec()
}

/// Maps a state-table lookup failure onto the `VkResult` a reply carries.
/// There is no real device to report `ERROR_OUT_OF_DEVICE_MEMORY` or
/// similar from, so every state error collapses to `ERROR_UNKNOWN` the same
/// way `venus_driver::invalid_usage` does on the client side for a locally
/// detected misuse.
fn result_code<T>(result: Result<T, StateError>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(err) => {
            warn!("command failed against server state: {err}");
            vk::Result::ERROR_UNKNOWN.as_raw()
        }
    }
}

/// Decodes one command header plus body from `payload`, dispatches it
/// against `state`, and returns the reply payload when the header's
/// `REPLY_EXPECTED` flag is set.
pub fn dispatch(state: &ServerState, payload: &[u8]) -> Option<Vec<u8>> {
    let mut dec = Decoder::new(payload);
    let header = CommandHeader::decode(&mut dec);
    let reply_expected = header.flags.contains(CommandFlags::REPLY_EXPECTED);
    let reply = dispatch_body(state, header.id, &mut dec);
    if dec.is_fatal() {
        warn!("command {:?} failed to decode its body", header.id);
        return None;
    }
    if reply_expected {
        reply
    } else {
        None
    }
}

fn dispatch_body(state: &ServerState, id: CommandId, dec: &mut Decoder) -> Option<Vec<u8>> {
    match id {
        CommandId::ENUMERATE_INSTANCE_VERSION => {
            let _args = decode_enumerate_instance_version_args(dec);
            Some(encode_reply(|enc| {
                encode_enumerate_instance_version_reply(
                    enc,
                    &EnumerateInstanceVersionReply {
                        result: SUCCESS,
                        api_version: venus_wire::VULKAN_XML_REGISTRY_VERSION,
                    },
                )
            }))
        }
        CommandId::CREATE_INSTANCE => {
            let _args = decode_create_instance_args(dec);
            let instance = state.ids.allocate();
            state.instances.lock().insert(instance, ());
            Some(encode_reply(|enc| {
                encode_create_instance_reply(enc, &CreateInstanceReply { result: SUCCESS, instance })
            }))
        }
        CommandId::DESTROY_INSTANCE => {
            let args = decode_destroy_instance_args(dec);
            state.instances.lock().remove(&args.instance);
            None
        }
        CommandId::ENUMERATE_PHYSICAL_DEVICES => {
            let args = decode_enumerate_physical_devices_args(dec);
            // One fixed fake GPU per server; reuse it across calls instead
            // of minting a new identity every time it's enumerated.
            let mut physical_devices = state.physical_devices.lock();
            let physical_device = match physical_devices.keys().next().copied() {
                Some(id) => id,
                None => {
                    let id = state.ids.allocate();
                    physical_devices.insert(id, ());
                    id
                }
            };
            drop(physical_devices);
            let _ = args.instance;
            Some(encode_reply(|enc| {
                encode_enumerate_physical_devices_reply(
                    enc,
                    &EnumeratePhysicalDevicesReply {
                        result: SUCCESS,
                        physical_devices: vec![physical_device],
                    },
                )
            }))
        }
        CommandId::GET_PHYSICAL_DEVICE_PROPERTIES => {
            let _args = decode_get_physical_device_properties_args(dec);
            let props = fake_gpu::physical_device_properties(venus_wire::VULKAN_XML_REGISTRY_VERSION);
            Some(encode_reply(|enc| encode_physical_device_properties(enc, &props)))
        }
        CommandId::GET_PHYSICAL_DEVICE_MEMORY_PROPERTIES => {
            let _args = decode_get_physical_device_properties_args(dec);
            let props = fake_gpu::physical_device_memory_properties();
            Some(encode_reply(|enc| encode_physical_device_memory_properties(enc, &props)))
        }

        CommandId::CREATE_DEVICE => {
            let args = decode_create_device_args(dec);
            let device = state.ids.allocate();
            state.devices.lock().insert(
                device,
                DeviceEntry {
                    physical_device: args.physical_device,
                },
            );
            Some(encode_reply(|enc| encode_create_device_reply(enc, &CreateDeviceReply { result: SUCCESS, device })))
        }
        CommandId::DESTROY_DEVICE => {
            let args = decode_destroy_device_args(dec);
            state.devices.lock().remove(&args.device);
            None
        }
        CommandId::GET_DEVICE_QUEUE => {
            let args = decode_get_device_queue_args(dec);
            let queue = state.ids.allocate();
            state.queues.lock().insert(
                queue,
                QueueEntry {
                    device: args.device,
                    queue_family_index: args.queue_family_index,
                    queue_index: args.queue_index,
                },
            );
            Some(encode_reply(|enc| encode_get_device_queue_reply(enc, &GetDeviceQueueReply { queue })))
        }

        CommandId::CREATE_BUFFER => {
            let args = decode_create_buffer_args(dec);
            let buffer = state.ids.allocate();
            state.buffers.lock().insert(
                buffer,
                BufferEntry {
                    device: args.device,
                    size: args.size,
                    binding: None,
                },
            );
            Some(encode_reply(|enc| encode_create_buffer_reply(enc, &CreateBufferReply { result: SUCCESS, buffer })))
        }
        CommandId::DESTROY_BUFFER => {
            let args = decode_destroy_buffer_args(dec);
            state.buffers.lock().remove(&args.buffer);
            None
        }
        CommandId::CREATE_IMAGE => {
            let args = decode_create_image_args(dec);
            let image = state.ids.allocate();
            state.images.lock().insert(image, ImageEntry { device: args.device, binding: None });
            Some(encode_reply(|enc| encode_create_image_reply(enc, &CreateImageReply { result: SUCCESS, image })))
        }
        CommandId::DESTROY_IMAGE => {
            let args = decode_destroy_image_args(dec);
            state.images.lock().remove(&args.image);
            None
        }
        CommandId::GET_BUFFER_MEMORY_REQUIREMENTS | CommandId::GET_IMAGE_MEMORY_REQUIREMENTS => {
            let args = decode_get_memory_requirements_args(dec);
            let size = state
                .buffers
                .lock()
                .get(&args.resource)
                .map(|b| b.size)
                .unwrap_or(4096);
            Some(encode_reply(|enc| {
                encode_memory_requirements_reply(
                    enc,
                    &MemoryRequirementsReply {
                        size: size.max(1),
                        alignment: 256,
                        memory_type_bits: (1 << fake_gpu::MEMORY_TYPE_DEVICE_LOCAL) | (1 << fake_gpu::MEMORY_TYPE_HOST_VISIBLE_COHERENT),
                    },
                )
            }))
        }
        CommandId::ALLOCATE_MEMORY => {
            let args = decode_allocate_memory_args(dec);
            let memory = state.ids.allocate();
            state.memory.lock().insert(
                memory,
                MemoryEntry {
                    device: args.device,
                    data: vec![0u8; args.allocation_size as usize],
                    mapped: false,
                },
            );
            let _ = args.memory_type_index;
            Some(encode_reply(|enc| encode_allocate_memory_reply(enc, &AllocateMemoryReply { result: SUCCESS, memory })))
        }
        CommandId::FREE_MEMORY => {
            let args = decode_free_memory_args(dec);
            state.memory.lock().remove(&args.memory);
            None
        }
        CommandId::BIND_BUFFER_MEMORY => {
            let args = decode_bind_resource_memory_args(dec);
            let result = bind_resource(&state.buffers, args.resource, args.memory, args.memory_offset);
            Some(encode_reply(|enc| {
                encode_resource_result_reply(enc, &ResourceResultReply { result: result_code(result) })
            }))
        }
        CommandId::BIND_IMAGE_MEMORY => {
            let args = decode_bind_resource_memory_args(dec);
            let result = bind_resource(&state.images, args.resource, args.memory, args.memory_offset);
            Some(encode_reply(|enc| {
                encode_resource_result_reply(enc, &ResourceResultReply { result: result_code(result) })
            }))
        }
        CommandId::MAP_MEMORY => {
            let args = decode_map_memory_args(dec);
            let result = (|| -> Result<(), StateError> {
                let mut table = state.memory.lock();
                let entry = table.get_mut(&args.memory).ok_or(StateError::UnknownObject(args.memory))?;
                entry.mapped = true;
                Ok(())
            })();
            let _ = (args.offset, args.size);
            Some(encode_reply(|enc| {
                encode_resource_result_reply(enc, &ResourceResultReply { result: result_code(result) })
            }))
        }
        CommandId::UNMAP_MEMORY => {
            let args = decode_unmap_memory_args(dec);
            if let Some(entry) = state.memory.lock().get_mut(&args.memory) {
                entry.mapped = false;
            }
            None
        }
        CommandId::FLUSH_MAPPED_MEMORY_RANGES | CommandId::INVALIDATE_MAPPED_MEMORY_RANGES => {
            // venus_driver never sends these: flush/invalidate go through
            // shadow push/pull over TRANSFER_MEMORY_DATA/READ_MEMORY_DATA
            // instead (see DESIGN.md). Kept here only so an unexpected
            // client doesn't silently desync the frame stream.
            warn!("received {:?}, which no client in this workspace ever sends", id);
            None
        }

        CommandId::CREATE_COMMAND_POOL => {
            let args = decode_create_command_pool_args(dec);
            let command_pool = state.ids.allocate();
            state.command_pools.lock().insert(
                command_pool,
                CommandPoolEntry {
                    device: args.device,
                    command_buffers: Vec::new(),
                },
            );
            Some(encode_reply(|enc| {
                encode_create_command_pool_reply(enc, &CreateCommandPoolReply { result: SUCCESS, command_pool })
            }))
        }
        CommandId::DESTROY_COMMAND_POOL => {
            let args = decode_destroy_command_pool_args(dec);
            if let Some(pool) = state.command_pools.lock().remove(&args.command_pool) {
                let mut buffers = state.command_buffers.lock();
                for cb in pool.command_buffers {
                    buffers.remove(&cb);
                }
            }
            None
        }
        CommandId::RESET_COMMAND_POOL => {
            let args = decode_reset_command_pool_args(dec);
            if let Some(pool) = state.command_pools.lock().get(&args.command_pool) {
                let mut buffers = state.command_buffers.lock();
                for cb in &pool.command_buffers {
                    if let Some(entry) = buffers.get_mut(cb) {
                        entry.recorded.clear();
                    }
                }
            }
            None
        }
        CommandId::ALLOCATE_COMMAND_BUFFERS => {
            let args = decode_allocate_command_buffers_args(dec);
            let mut command_buffers = Vec::with_capacity(args.count as usize);
            for _ in 0..args.count {
                let cb = state.ids.allocate();
                state.command_buffers.lock().insert(
                    cb,
                    CommandBufferEntry {
                        pool: args.command_pool,
                        recorded: Vec::new(),
                    },
                );
                command_buffers.push(cb);
            }
            if let Some(pool) = state.command_pools.lock().get_mut(&args.command_pool) {
                pool.command_buffers.extend_from_slice(&command_buffers);
            }
            let _ = args.level;
            Some(encode_reply(|enc| {
                encode_allocate_command_buffers_reply(
                    enc,
                    &AllocateCommandBuffersReply {
                        result: SUCCESS,
                        command_buffers,
                    },
                )
            }))
        }
        CommandId::FREE_COMMAND_BUFFERS => {
            let args = decode_free_command_buffers_args(dec);
            let mut buffers = state.command_buffers.lock();
            for cb in &args.command_buffers {
                buffers.remove(cb);
            }
            drop(buffers);
            if let Some(pool) = state.command_pools.lock().get_mut(&args.command_pool) {
                pool.command_buffers.retain(|cb| !args.command_buffers.contains(cb));
            }
            None
        }
        CommandId::BEGIN_COMMAND_BUFFER => {
            let args = decode_begin_command_buffer_args(dec);
            if let Some(entry) = state.command_buffers.lock().get_mut(&args.command_buffer) {
                entry.recorded.clear();
            }
            None
        }
        CommandId::END_COMMAND_BUFFER => {
            let _args = decode_end_command_buffer_args(dec);
            None
        }
        CommandId::RESET_COMMAND_BUFFER => {
            let args = decode_reset_command_buffer_args(dec);
            if let Some(entry) = state.command_buffers.lock().get_mut(&args.command_buffer) {
                entry.recorded.clear();
            }
            None
        }
        CommandId::CMD_BIND_DESCRIPTOR_SETS => {
            // No pipeline state exists on a fake GPU to bind against; this
            // command is accepted and decoded for wire completeness and then
            // dropped, mirroring how events are tracked but never driven.
            let _args = decode_cmd_bind_descriptor_sets_args(dec);
            None
        }
        CommandId::CMD_COPY_BUFFER => {
            let args = decode_cmd_copy_buffer_args(dec);
            if let Some(entry) = state.command_buffers.lock().get_mut(&args.command_buffer) {
                entry.recorded.push(RecordedOp::CopyBuffer {
                    src_buffer: args.src_buffer,
                    dst_buffer: args.dst_buffer,
                    regions: args.regions,
                });
            }
            None
        }
        CommandId::CMD_FILL_BUFFER => {
            let args = decode_cmd_fill_buffer_args(dec);
            if let Some(entry) = state.command_buffers.lock().get_mut(&args.command_buffer) {
                entry.recorded.push(RecordedOp::FillBuffer {
                    dst_buffer: args.dst_buffer,
                    dst_offset: args.dst_offset,
                    size: args.size,
                    data: args.data,
                });
            }
            None
        }

        CommandId::CREATE_FENCE => {
            let args = decode_create_fence_args(dec);
            let fence = state.ids.allocate();
            state.fences.lock().insert(
                fence,
                FenceEntry {
                    device: args.device,
                    signaled: args.signaled,
                },
            );
            Some(encode_reply(|enc| encode_create_fence_reply(enc, &CreateFenceReply { result: SUCCESS, fence })))
        }
        CommandId::DESTROY_FENCE => {
            let args = decode_destroy_fence_args(dec);
            state.fences.lock().remove(&args.fence);
            None
        }
        CommandId::RESET_FENCES => {
            let args = decode_reset_fences_args(dec);
            let mut fences = state.fences.lock();
            for f in &args.fences {
                if let Some(entry) = fences.get_mut(f) {
                    entry.signaled = false;
                }
            }
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: SUCCESS })))
        }
        CommandId::WAIT_FOR_FENCES => {
            // A fake GPU executes submissions synchronously, so by the time a
            // wait is observed every recorded fence has already reached its
            // terminal state; there's nothing to actually block on.
            let args = decode_wait_for_fences_args(dec);
            let _ = (args.fences, args.wait_all, args.timeout_ns);
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: SUCCESS })))
        }
        CommandId::GET_FENCE_STATUS => {
            let args = decode_get_fence_status_args(dec);
            let signaled = state.fences.lock().get(&args.fence).map(|f| f.signaled).unwrap_or(false);
            let result = if signaled { SUCCESS } else { vk::Result::NOT_READY.as_raw() };
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result })))
        }
        CommandId::CREATE_SEMAPHORE => {
            let args = decode_create_semaphore_args(dec);
            let semaphore = state.ids.allocate();
            state.semaphores.lock().insert(
                semaphore,
                SemaphoreEntry {
                    device: args.device,
                    is_timeline: args.is_timeline,
                    value: args.initial_value,
                },
            );
            Some(encode_reply(|enc| {
                encode_create_semaphore_reply(enc, &CreateSemaphoreReply { result: SUCCESS, semaphore })
            }))
        }
        CommandId::DESTROY_SEMAPHORE => {
            let args = decode_destroy_semaphore_args(dec);
            state.semaphores.lock().remove(&args.semaphore);
            None
        }
        CommandId::SIGNAL_SEMAPHORE => {
            let args = decode_signal_semaphore_args(dec);
            let result = (|| -> Result<(), StateError> {
                let mut table = state.semaphores.lock();
                let entry = table.get_mut(&args.semaphore).ok_or(StateError::UnknownObject(args.semaphore))?;
                entry.value = args.value;
                Ok(())
            })();
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: result_code(result) })))
        }
        CommandId::WAIT_SEMAPHORES => {
            let args = decode_wait_semaphores_args(dec);
            let _ = (args.semaphores, args.values, args.wait_all, args.timeout_ns);
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: SUCCESS })))
        }
        CommandId::GET_SEMAPHORE_COUNTER_VALUE => {
            let args = decode_get_semaphore_counter_value_args(dec);
            let value = state.semaphores.lock().get(&args.semaphore).map(|s| s.value).unwrap_or(0);
            Some(encode_reply(|enc| {
                encode_get_semaphore_counter_value_reply(enc, &GetSemaphoreCounterValueReply { result: SUCCESS, value })
            }))
        }
        CommandId::CREATE_EVENT => {
            let args = decode_create_event_args(dec);
            let event = state.ids.allocate();
            state.events.lock().insert(event, EventEntry { device: args.device, set: false });
            Some(encode_reply(|enc| encode_create_event_reply(enc, &CreateEventReply { result: SUCCESS, event })))
        }
        CommandId::DESTROY_EVENT => {
            let args = decode_event_args(dec);
            state.events.lock().remove(&args.event);
            None
        }
        CommandId::SET_EVENT => {
            let args = decode_event_args(dec);
            let result = set_event(state, args.event, true);
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: result_code(result) })))
        }
        CommandId::RESET_EVENT => {
            let args = decode_event_args(dec);
            let result = set_event(state, args.event, false);
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: result_code(result) })))
        }
        CommandId::GET_EVENT_STATUS => {
            let args = decode_event_args(dec);
            let set = state.events.lock().get(&args.event).map(|e| e.set).unwrap_or(false);
            let result = if set { SUCCESS } else { vk::Result::EVENT_RESET.as_raw() };
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result })))
        }
        CommandId::QUEUE_SUBMIT => {
            let args = decode_queue_submit_args(dec);
            let all_cbs: Vec<ServerIdentity> = args.submits.iter().flat_map(|s| s.command_buffers.iter().copied()).collect();
            let result = state.replay_submission(&all_cbs);
            if result.is_ok() {
                if let Some(fence) = args.fence {
                    if let Some(entry) = state.fences.lock().get_mut(&fence) {
                        entry.signaled = true;
                    }
                }
                for submit in &args.submits {
                    let mut semaphores = state.semaphores.lock();
                    for (sem, value) in submit.signal_semaphores.iter().zip(submit.signal_values.iter()) {
                        if let Some(entry) = semaphores.get_mut(sem) {
                            entry.value = *value;
                        }
                    }
                }
            }
            let _ = args.queue;
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: result_code(result) })))
        }
        CommandId::QUEUE_WAIT_IDLE => {
            let _args = decode_queue_wait_idle_args(dec);
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: SUCCESS })))
        }
        CommandId::DEVICE_WAIT_IDLE => {
            let _args = decode_device_wait_idle_args(dec);
            Some(encode_reply(|enc| encode_sync_result_reply(enc, &SyncResultReply { result: SUCCESS })))
        }

        CommandId::CREATE_QUERY_POOL => {
            let args = decode_create_query_pool_args(dec);
            let query_pool = state.ids.allocate();
            state.query_pools.lock().insert(
                query_pool,
                QueryPoolEntry {
                    device: args.device,
                    query_count: args.query_count,
                    results: vec![0u64; args.query_count as usize],
                },
            );
            let _ = args.query_type;
            Some(encode_reply(|enc| {
                encode_create_query_pool_reply(enc, &CreateQueryPoolReply { result: SUCCESS, query_pool })
            }))
        }
        CommandId::DESTROY_QUERY_POOL => {
            let args = decode_destroy_query_pool_args(dec);
            state.query_pools.lock().remove(&args.query_pool);
            None
        }
        CommandId::CMD_RESET_QUERY_POOL => {
            let args = decode_cmd_query_range_args(dec);
            if let Some(pool) = state.query_pools.lock().get_mut(&args.query_pool) {
                for i in args.first_query..(args.first_query + args.query_count).min(pool.query_count) {
                    pool.results[i as usize] = 0;
                }
            }
            None
        }
        CommandId::CMD_BEGIN_QUERY => {
            let _args = decode_cmd_begin_query_args(dec);
            None
        }
        CommandId::CMD_END_QUERY => {
            // No real hardware counter exists; a query that ends is recorded
            // as having produced a zero result, which is observable and
            // stable rather than left uninitialized.
            let args = decode_cmd_end_query_args(dec);
            if let Some(pool) = state.query_pools.lock().get_mut(&args.query_pool) {
                if (args.query as usize) < pool.results.len() {
                    pool.results[args.query as usize] = 0;
                }
            }
            None
        }
        CommandId::GET_QUERY_POOL_RESULTS => {
            let args = decode_get_query_pool_results_args(dec);
            let values = state
                .query_pools
                .lock()
                .get(&args.query_pool)
                .map(|pool| {
                    let start = args.first_query as usize;
                    let end = (start + args.query_count as usize).min(pool.results.len());
                    pool.results.get(start..end).map(|s| s.to_vec()).unwrap_or_default()
                })
                .unwrap_or_default();
            let _ = args.flags;
            Some(encode_reply(|enc| {
                encode_get_query_pool_results_reply(enc, &GetQueryPoolResultsReply { result: SUCCESS, values })
            }))
        }

        CommandId::TRANSFER_MEMORY_DATA => {
            let args = decode_transfer_memory_data_args(dec);
            let result = state.write_memory(args.memory, args.offset, &args.data);
            let _ = args.device;
            Some(encode_reply(|enc| {
                encode_transfer_memory_data_reply(enc, &TransferMemoryDataReply { result: result_code(result) })
            }))
        }
        CommandId::READ_MEMORY_DATA => {
            let args = decode_read_memory_data_args(dec);
            let result = state.read_memory(args.memory, args.offset, args.size);
            let _ = args.device;
            let (result_i32, data) = match result {
                Ok(data) => (SUCCESS, data),
                Err(err) => {
                    warn!("read_memory_data failed: {err}");
                    (vk::Result::ERROR_UNKNOWN.as_raw(), Vec::new())
                }
            };
            Some(encode_reply(|enc| {
                encode_read_memory_data_reply(enc, &ReadMemoryDataReply { result: result_i32, data })
            }))
        }

        other => {
            warn!("no handler registered for command {:?}", other);
            None
        }
    }
}

fn bind_resource<T>(table: &parking_lot::Mutex<std::collections::HashMap<ServerIdentity, T>>, resource: ServerIdentity, memory: ServerIdentity, offset: u64) -> Result<(), StateError>
where
    T: BindableResource,
{
    let mut table = table.lock();
    let entry = table.get_mut(&resource).ok_or(StateError::UnknownObject(resource))?;
    entry.set_binding(memory, offset);
    Ok(())
}

trait BindableResource {
    fn set_binding(&mut self, memory: ServerIdentity, offset: u64);
}

impl BindableResource for BufferEntry {
    fn set_binding(&mut self, memory: ServerIdentity, offset: u64) {
        self.binding = Some((memory, offset));
    }
}

impl BindableResource for ImageEntry {
    fn set_binding(&mut self, memory: ServerIdentity, offset: u64) {
        self.binding = Some((memory, offset));
    }
}

fn set_event(state: &ServerState, event: ServerIdentity, set: bool) -> Result<(), StateError> {
    let mut events = state.events.lock();
    let entry = events.get_mut(&event).ok_or(StateError::UnknownObject(event))?;
    entry.set = set;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(state: &ServerState, id: CommandId, body: impl Fn(&mut Encoder)) -> Vec<u8> {
        let mut enc = Encoder::dynamic();
        enc.acquire();
        CommandHeader::new(id, CommandFlags::REPLY_EXPECTED).encode(&mut enc);
        body(&mut enc);
        dispatch(state, enc.data()).expect("reply expected")
    }

    #[test]
    fn enumerate_instance_version_reports_the_codec_version() {
        let state = ServerState::new();
        let reply = call(&state, CommandId::ENUMERATE_INSTANCE_VERSION, |_| {});
        let mut dec = Decoder::new(&reply);
        let reply = decode_enumerate_instance_version_reply(&mut dec);
        assert_eq!(reply.api_version, venus_wire::VULKAN_XML_REGISTRY_VERSION);
    }

    #[test]
    fn create_instance_then_enumerate_physical_devices_returns_the_fake_gpu() {
        let state = ServerState::new();
        let reply = call(&state, CommandId::CREATE_INSTANCE, |enc| {
            encode_create_instance_args(
                enc,
                &CreateInstanceArgs {
                    api_version: venus_wire::VULKAN_XML_REGISTRY_VERSION,
                    application_name: "test".into(),
                    enabled_extensions: vec![],
                },
            )
        });
        let mut dec = Decoder::new(&reply);
        let instance = decode_create_instance_reply(&mut dec).instance;

        let reply = call(&state, CommandId::ENUMERATE_PHYSICAL_DEVICES, |enc| {
            encode_enumerate_physical_devices_args(enc, &EnumeratePhysicalDevicesArgs { instance })
        });
        let mut dec = Decoder::new(&reply);
        let physical_devices = decode_enumerate_physical_devices_reply(&mut dec).physical_devices;
        assert_eq!(physical_devices.len(), 1);

        let reply = call(&state, CommandId::GET_PHYSICAL_DEVICE_PROPERTIES, |enc| {
            encode_get_physical_device_properties_args(
                enc,
                &GetPhysicalDevicePropertiesArgs {
                    physical_device: physical_devices[0],
                },
            )
        });
        let mut dec = Decoder::new(&reply);
        let props = decode_physical_device_properties(&mut dec);
        assert_eq!(props.device_name, "Venus Plus Virtual GPU");
    }

    #[test]
    fn fire_and_forget_destroy_instance_produces_no_reply() {
        let state = ServerState::new();
        let instance = ServerIdentity(1);
        state.instances.lock().insert(instance, ());
        let mut enc = Encoder::dynamic();
        enc.acquire();
        CommandHeader::new(CommandId::DESTROY_INSTANCE, CommandFlags::empty()).encode(&mut enc);
        encode_destroy_instance_args(&mut enc, &DestroyInstanceArgs { instance });
        assert!(dispatch(&state, enc.data()).is_none());
        assert!(state.instances.lock().is_empty());
    }

    #[test]
    fn buffer_fill_then_read_memory_round_trips() {
        let state = ServerState::new();
        let device = ServerIdentity(1);
        state.devices.lock().insert(device, DeviceEntry { physical_device: ServerIdentity(2) });

        let reply = call(&state, CommandId::ALLOCATE_MEMORY, |enc| {
            encode_allocate_memory_args(
                enc,
                &AllocateMemoryArgs {
                    device,
                    allocation_size: 64,
                    memory_type_index: 0,
                },
            )
        });
        let memory = decode_allocate_memory_reply(&mut Decoder::new(&reply)).memory;

        let reply = call(&state, CommandId::CREATE_BUFFER, |enc| {
            encode_create_buffer_args(
                enc,
                &CreateBufferArgs {
                    device,
                    size: 16,
                    usage: 0,
                    sharing_mode: 0,
                },
            )
        });
        let buffer = decode_create_buffer_reply(&mut Decoder::new(&reply)).buffer;

        call(&state, CommandId::BIND_BUFFER_MEMORY, |enc| {
            encode_bind_resource_memory_args(
                enc,
                &BindResourceMemoryArgs {
                    device,
                    resource: buffer,
                    memory,
                    memory_offset: 0,
                },
            )
        });

        let reply = call(&state, CommandId::ALLOCATE_COMMAND_BUFFERS, |enc| {
            let command_pool_reply = call(&state, CommandId::CREATE_COMMAND_POOL, |enc| {
                encode_create_command_pool_args(
                    enc,
                    &CreateCommandPoolArgs {
                        device,
                        queue_family_index: 0,
                        flags: 0,
                    },
                )
            });
            let command_pool = decode_create_command_pool_reply(&mut Decoder::new(&command_pool_reply)).command_pool;
            encode_allocate_command_buffers_args(
                enc,
                &AllocateCommandBuffersArgs {
                    device,
                    command_pool,
                    level: 0,
                    count: 1,
                },
            )
        });
        let command_buffer = decode_allocate_command_buffers_reply(&mut Decoder::new(&reply)).command_buffers[0];

        let mut enc = Encoder::dynamic();
        enc.acquire();
        CommandHeader::new(CommandId::CMD_FILL_BUFFER, CommandFlags::empty()).encode(&mut enc);
        encode_cmd_fill_buffer_args(
            &mut enc,
            &CmdFillBufferArgs {
                command_buffer,
                dst_buffer: buffer,
                dst_offset: 0,
                size: 16,
                data: 0x11223344,
            },
        );
        dispatch(&state, enc.data());

        call(&state, CommandId::QUEUE_SUBMIT, |enc| {
            encode_queue_submit_args(
                enc,
                &QueueSubmitArgs {
                    queue: ServerIdentity(999),
                    submits: vec![SubmitInfo {
                        wait_semaphores: vec![],
                        wait_values: vec![],
                        wait_stage_masks: vec![],
                        command_buffers: vec![command_buffer],
                        signal_semaphores: vec![],
                        signal_values: vec![],
                    }],
                    fence: None,
                },
            )
        });

        let reply = call(&state, CommandId::READ_MEMORY_DATA, |enc| {
            encode_read_memory_data_args(
                enc,
                &ReadMemoryDataArgs {
                    device,
                    memory,
                    offset: 0,
                    size: 4,
                },
            )
        });
        let read = decode_read_memory_data_reply(&mut Decoder::new(&reply));
        assert_eq!(read.result, SUCCESS);
        assert_eq!(read.data, 0x11223344u32.to_le_bytes().to_vec());
    }
}
