//! Fence, semaphore, and queue submission/wait.
//!
//! `Event` is deliberately absent here: the registry's `SyncTracker` tracks
//! the full `Event` shape, but per the resolved open
//! question in `DESIGN.md` no call site ever drove event creation in the
//! source this was ported from, so this module preserves that rather than
//! inventing a use for it.

use ash::vk;

use venus_registry::{ClientKey, CommandBuffer, Device, Fence, FenceRecord, Queue, Semaphore, SemaphoreRecord};
use venus_ring::RingError;
use venus_wire::command::{CommandFlags, CommandId};
use venus_wire::commands::sync::*;

use crate::{invalid_usage, vk_result_from_i32, Driver, DriverError, Result};

/// Client-facing mirror of [`SubmitInfo`], in terms of registry handles
/// instead of bare [`venus_wire::ServerIdentity`] values -- application code
/// only ever holds the former, the same way it never sees a raw Vulkan
/// dispatch-table pointer.
pub struct SubmitBatch {
    pub wait_semaphores: Vec<ClientKey<Semaphore>>,
    pub wait_values: Vec<u64>,
    pub wait_stage_masks: Vec<u32>,
    pub command_buffers: Vec<ClientKey<CommandBuffer>>,
    pub signal_semaphores: Vec<ClientKey<Semaphore>>,
    pub signal_values: Vec<u64>,
}

impl Driver {
    pub fn create_fence(&self, device: ClientKey<Device>, signaled: bool) -> Result<ClientKey<Fence>> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::CREATE_FENCE,
            CommandFlags::empty(),
            |enc| encode_create_fence_args(enc, &CreateFenceArgs { device: identity, signaled }),
            decode_create_fence_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_fence_key();
        self.registry.sync.lock().insert_fence(
            key,
            FenceRecord {
                device,
                server_identity: reply.fence,
                signaled,
            },
        );
        Ok(key)
    }

    pub fn destroy_fence(&self, device: ClientKey<Device>, fence: ClientKey<Fence>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let fence_identity = self.registry.sync.lock().fence(fence).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::DESTROY_FENCE, CommandFlags::empty(), |enc| {
            encode_destroy_fence_args(
                enc,
                &DestroyFenceArgs {
                    device: device_identity,
                    fence: fence_identity,
                },
            )
        })?;
        self.registry.sync.lock().remove_fence(fence);
        Ok(())
    }

    pub fn reset_fences(&self, device: ClientKey<Device>, fences: &[ClientKey<Fence>]) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let identities = {
            let sync = self.registry.sync.lock();
            fences
                .iter()
                .map(|f| sync.fence(*f).map(|r| r.server_identity))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(invalid_usage)?
        };
        let reply = self.ring.call(
            CommandId::RESET_FENCES,
            CommandFlags::empty(),
            |enc| {
                encode_reset_fences_args(
                    enc,
                    &ResetFencesArgs {
                        device: device_identity,
                        fences: identities.clone(),
                    },
                )
            },
            decode_sync_result_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        self.registry.sync.lock().reset_fences(fences).map_err(invalid_usage)
    }

    /// `vkWaitForFences`. A round trip to the server: the cached `signaled` bit is never consulted here, only
    /// refreshed afterwards, since the server is the sole authority on
    /// whether a wait is actually satisfied.
    pub fn wait_for_fences(&self, device: ClientKey<Device>, fences: &[ClientKey<Fence>], wait_all: bool, timeout_ns: u64) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let identities = {
            let sync = self.registry.sync.lock();
            fences
                .iter()
                .map(|f| sync.fence(*f).map(|r| r.server_identity))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(invalid_usage)?
        };
        let reply = self.ring.call(
            CommandId::WAIT_FOR_FENCES,
            CommandFlags::empty(),
            |enc| {
                encode_wait_for_fences_args(
                    enc,
                    &WaitForFencesArgs {
                        device: device_identity,
                        fences: identities.clone(),
                        wait_all,
                        timeout_ns,
                    },
                )
            },
            decode_sync_result_reply,
        );
        let reply = match reply {
            Ok(r) => r,
            Err(RingError::DeviceLost) | Err(RingError::Transport(_)) => {
                self.registry.lifecycle.lock().mark_all_invalid();
                return Err(DriverError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
            }
            Err(e) => return Err(e.into()),
        };
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        if wait_all {
            let mut sync = self.registry.sync.lock();
            for f in fences {
                sync.set_fence_signaled(*f, true).ok();
            }
        }
        Ok(())
    }

    pub fn get_fence_status(&self, device: ClientKey<Device>, fence: ClientKey<Fence>) -> Result<bool> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let fence_identity = self.registry.sync.lock().fence(fence).map_err(invalid_usage)?.server_identity;
        let reply = self.ring.call(
            CommandId::GET_FENCE_STATUS,
            CommandFlags::empty(),
            |enc| {
                encode_get_fence_status_args(
                    enc,
                    &GetFenceStatusArgs {
                        device: device_identity,
                        fence: fence_identity,
                    },
                )
            },
            decode_sync_result_reply,
        )?;
        let signaled = reply.result == vk::Result::SUCCESS.as_raw();
        if reply.result == vk::Result::SUCCESS.as_raw() || reply.result == vk::Result::NOT_READY.as_raw() {
            self.registry.sync.lock().set_fence_signaled(fence, signaled).ok();
            return Ok(signaled);
        }
        Err(DriverError::Vulkan(vk_result_from_i32(reply.result)))
    }

    pub fn create_semaphore(&self, device: ClientKey<Device>, is_timeline: bool, initial_value: u64) -> Result<ClientKey<Semaphore>> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::CREATE_SEMAPHORE,
            CommandFlags::empty(),
            |enc| {
                encode_create_semaphore_args(
                    enc,
                    &CreateSemaphoreArgs {
                        device: identity,
                        is_timeline,
                        initial_value,
                    },
                )
            },
            decode_create_semaphore_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_semaphore_key();
        self.registry.sync.lock().insert_semaphore(
            key,
            SemaphoreRecord {
                device,
                server_identity: reply.semaphore,
                is_timeline,
                value: initial_value,
            },
        );
        Ok(key)
    }

    pub fn destroy_semaphore(&self, device: ClientKey<Device>, semaphore: ClientKey<Semaphore>) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let semaphore_identity = self.registry.sync.lock().semaphore(semaphore).map_err(invalid_usage)?.server_identity;
        self.ring.send(CommandId::DESTROY_SEMAPHORE, CommandFlags::empty(), |enc| {
            encode_destroy_semaphore_args(
                enc,
                &DestroySemaphoreArgs {
                    device: device_identity,
                    semaphore: semaphore_identity,
                },
            )
        })?;
        self.registry.sync.lock().remove_semaphore(semaphore);
        Ok(())
    }

    /// `vkSignalSemaphore` (timeline-only, like real Vulkan). The server is
    /// told first; the cached counter is only advanced once it confirms.
    pub fn signal_semaphore(&self, device: ClientKey<Device>, semaphore: ClientKey<Semaphore>, value: u64) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let semaphore_identity = self.registry.sync.lock().semaphore(semaphore).map_err(invalid_usage)?.server_identity;
        let reply = self.ring.call(
            CommandId::SIGNAL_SEMAPHORE,
            CommandFlags::empty(),
            |enc| {
                encode_signal_semaphore_args(
                    enc,
                    &SignalSemaphoreArgs {
                        device: device_identity,
                        semaphore: semaphore_identity,
                        value,
                    },
                )
            },
            decode_sync_result_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        self.registry.sync.lock().signal_semaphore(semaphore, value).map_err(invalid_usage)
    }

    pub fn wait_semaphores(
        &self,
        device: ClientKey<Device>,
        semaphores: &[ClientKey<Semaphore>],
        values: &[u64],
        wait_all: bool,
        timeout_ns: u64,
    ) -> Result<()> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let identities = {
            let sync = self.registry.sync.lock();
            semaphores
                .iter()
                .map(|s| sync.semaphore(*s).map(|r| r.server_identity))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(invalid_usage)?
        };
        let reply = self.ring.call(
            CommandId::WAIT_SEMAPHORES,
            CommandFlags::empty(),
            |enc| {
                encode_wait_semaphores_args(
                    enc,
                    &WaitSemaphoresArgs {
                        device: device_identity,
                        semaphores: identities.clone(),
                        values: values.to_vec(),
                        wait_all,
                        timeout_ns,
                    },
                )
            },
            decode_sync_result_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let mut sync = self.registry.sync.lock();
        for (s, v) in semaphores.iter().zip(values.iter()) {
            sync.signal_semaphore(*s, *v).ok();
        }
        Ok(())
    }

    pub fn get_semaphore_counter_value(&self, device: ClientKey<Device>, semaphore: ClientKey<Semaphore>) -> Result<u64> {
        let device_identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let semaphore_identity = self.registry.sync.lock().semaphore(semaphore).map_err(invalid_usage)?.server_identity;
        let reply = self.ring.call(
            CommandId::GET_SEMAPHORE_COUNTER_VALUE,
            CommandFlags::empty(),
            |enc| {
                encode_get_semaphore_counter_value_args(
                    enc,
                    &GetSemaphoreCounterValueArgs {
                        device: device_identity,
                        semaphore: semaphore_identity,
                    },
                )
            },
            decode_get_semaphore_counter_value_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        self.registry.sync.lock().signal_semaphore(semaphore, reply.value).ok();
        Ok(reply.value)
    }

    /// `vkQueueSubmit`. Every command buffer in every batch must be
    /// `Executable` -- checked locally before anything is sent, the same
    /// precondition a real ICD's validation layer would have caught. On a
    /// closed transport this is where the device-lost cascade becomes
    /// observable: the ring reports `DeviceLost`, every command buffer this
    /// connection knows about is forced `Invalid`, and the call itself
    /// surfaces `VK_ERROR_DEVICE_LOST` to the application.
    pub fn queue_submit(&self, queue: ClientKey<Queue>, submits: Vec<SubmitBatch>, fence: Option<ClientKey<Fence>>) -> Result<()> {
        let queue_identity = self.registry.queue_identity(queue).map_err(invalid_usage)?;
        let fence_identity = match fence {
            Some(f) => Some(self.registry.sync.lock().fence(f).map_err(invalid_usage)?.server_identity),
            None => None,
        };
        let wire_submits = {
            let lifecycle = self.registry.lifecycle.lock();
            let sync = self.registry.sync.lock();
            let mut wire_submits = Vec::with_capacity(submits.len());
            for batch in submits {
                let mut command_buffers = Vec::with_capacity(batch.command_buffers.len());
                for cb in &batch.command_buffers {
                    lifecycle.require_executable(*cb).map_err(invalid_usage)?;
                    command_buffers.push(lifecycle.command_buffer(*cb).map_err(invalid_usage)?.server_identity);
                }
                let mut wait_semaphores = Vec::with_capacity(batch.wait_semaphores.len());
                for s in &batch.wait_semaphores {
                    wait_semaphores.push(sync.semaphore(*s).map_err(invalid_usage)?.server_identity);
                }
                let mut signal_semaphores = Vec::with_capacity(batch.signal_semaphores.len());
                for s in &batch.signal_semaphores {
                    signal_semaphores.push(sync.semaphore(*s).map_err(invalid_usage)?.server_identity);
                }
                wire_submits.push(SubmitInfo {
                    wait_semaphores,
                    wait_values: batch.wait_values,
                    wait_stage_masks: batch.wait_stage_masks,
                    command_buffers,
                    signal_semaphores,
                    signal_values: batch.signal_values,
                });
            }
            wire_submits
        };
        let args = QueueSubmitArgs {
            queue: queue_identity,
            submits: wire_submits,
            fence: fence_identity,
        };
        let reply = self.ring.call(
            CommandId::QUEUE_SUBMIT,
            CommandFlags::empty(),
            |enc| encode_queue_submit_args(enc, &args),
            decode_sync_result_reply,
        );
        let reply = match reply {
            Ok(r) => r,
            Err(RingError::DeviceLost) | Err(RingError::Transport(_)) => {
                self.registry.lifecycle.lock().mark_all_invalid();
                return Err(DriverError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
            }
            Err(e) => return Err(e.into()),
        };
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        Ok(())
    }

    pub fn queue_wait_idle(&self, queue: ClientKey<Queue>) -> Result<()> {
        let identity = self.registry.queue_identity(queue).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::QUEUE_WAIT_IDLE,
            CommandFlags::empty(),
            |enc| encode_queue_wait_idle_args(enc, &QueueWaitIdleArgs { queue: identity }),
            decode_sync_result_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        Ok(())
    }

    pub fn device_wait_idle(&self, device: ClientKey<Device>) -> Result<()> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::DEVICE_WAIT_IDLE,
            CommandFlags::empty(),
            |enc| encode_device_wait_idle_args(enc, &DeviceWaitIdleArgs { device: identity }),
            decode_sync_result_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        Ok(())
    }
}
