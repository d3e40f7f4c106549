//! Fences, semaphores, events, and queue submission/wait.
//!
//! `Event` has a full args/reply shape here even though `venus_driver` never
//! drives it end to end -- events are tracked on the server and in
//! `venus_registry` but left unreachable from any driver call path, and
//! this codec preserves that surface rather than inventing new semantics
//! for a feature nothing exercises.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::handle::ServerIdentity;
use crate::primitives::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateFenceArgs {
    pub device: ServerIdentity,
    pub signaled: bool,
}

pub fn encode_create_fence_args(enc: &mut Encoder, args: &CreateFenceArgs) {
    encode_identity(enc, args.device);
    encode_bool(enc, args.signaled);
}

pub fn decode_create_fence_args(dec: &mut Decoder) -> CreateFenceArgs {
    CreateFenceArgs {
        device: decode_identity(dec),
        signaled: decode_bool(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateFenceReply {
    pub result: i32,
    pub fence: ServerIdentity,
}

pub fn encode_create_fence_reply(enc: &mut Encoder, reply: &CreateFenceReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.fence);
}

pub fn decode_create_fence_reply(dec: &mut Decoder) -> CreateFenceReply {
    CreateFenceReply {
        result: decode_i32(dec),
        fence: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyFenceArgs {
    pub device: ServerIdentity,
    pub fence: ServerIdentity,
}

pub fn encode_destroy_fence_args(enc: &mut Encoder, args: &DestroyFenceArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.fence);
}

pub fn decode_destroy_fence_args(dec: &mut Decoder) -> DestroyFenceArgs {
    DestroyFenceArgs {
        device: decode_identity(dec),
        fence: decode_identity(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetFencesArgs {
    pub device: ServerIdentity,
    pub fences: Vec<ServerIdentity>,
}

pub fn encode_reset_fences_args(enc: &mut Encoder, args: &ResetFencesArgs) {
    encode_identity(enc, args.device);
    encode_identity_array(enc, &args.fences);
}

pub fn decode_reset_fences_args(dec: &mut Decoder) -> ResetFencesArgs {
    ResetFencesArgs {
        device: decode_identity(dec),
        fences: decode_identity_array(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitForFencesArgs {
    pub device: ServerIdentity,
    pub fences: Vec<ServerIdentity>,
    pub wait_all: bool,
    pub timeout_ns: u64,
}

pub fn encode_wait_for_fences_args(enc: &mut Encoder, args: &WaitForFencesArgs) {
    encode_identity(enc, args.device);
    encode_identity_array(enc, &args.fences);
    encode_bool(enc, args.wait_all);
    encode_u64(enc, args.timeout_ns);
}

pub fn decode_wait_for_fences_args(dec: &mut Decoder) -> WaitForFencesArgs {
    WaitForFencesArgs {
        device: decode_identity(dec),
        fences: decode_identity_array(dec),
        wait_all: decode_bool(dec),
        timeout_ns: decode_u64(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetFenceStatusArgs {
    pub device: ServerIdentity,
    pub fence: ServerIdentity,
}

pub fn encode_get_fence_status_args(enc: &mut Encoder, args: &GetFenceStatusArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.fence);
}

pub fn decode_get_fence_status_args(dec: &mut Decoder) -> GetFenceStatusArgs {
    GetFenceStatusArgs {
        device: decode_identity(dec),
        fence: decode_identity(dec),
    }
}

/// Shared reply shape for every sync/submit operation here that reports
/// nothing beyond a `VkResult` -- `vkResetFences`, `vkWaitForFences`,
/// `vkGetFenceStatus`, `vkSignalSemaphore`, `vkWaitSemaphores`,
/// `vkSetEvent`/`vkResetEvent`/`vkGetEventStatus`, `vkQueueSubmit`,
/// `vkQueueWaitIdle`, `vkDeviceWaitIdle`. The destroy operations in this
/// module are fire-and-forget (`vkDestroy*` returns `void`) and carry no
/// reply at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncResultReply {
    pub result: i32,
}

pub fn encode_sync_result_reply(enc: &mut Encoder, reply: &SyncResultReply) {
    encode_i32(enc, reply.result);
}

pub fn decode_sync_result_reply(dec: &mut Decoder) -> SyncResultReply {
    SyncResultReply {
        result: decode_i32(dec),
    }
}

/// Binary or timeline, mirroring `VkSemaphoreType`. Timeline semaphores
/// carry a monotonically increasing counter the driver must never observe
/// decrease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateSemaphoreArgs {
    pub device: ServerIdentity,
    pub is_timeline: bool,
    pub initial_value: u64,
}

pub fn encode_create_semaphore_args(enc: &mut Encoder, args: &CreateSemaphoreArgs) {
    encode_identity(enc, args.device);
    encode_bool(enc, args.is_timeline);
    encode_u64(enc, args.initial_value);
}

pub fn decode_create_semaphore_args(dec: &mut Decoder) -> CreateSemaphoreArgs {
    CreateSemaphoreArgs {
        device: decode_identity(dec),
        is_timeline: decode_bool(dec),
        initial_value: decode_u64(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateSemaphoreReply {
    pub result: i32,
    pub semaphore: ServerIdentity,
}

pub fn encode_create_semaphore_reply(enc: &mut Encoder, reply: &CreateSemaphoreReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.semaphore);
}

pub fn decode_create_semaphore_reply(dec: &mut Decoder) -> CreateSemaphoreReply {
    CreateSemaphoreReply {
        result: decode_i32(dec),
        semaphore: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroySemaphoreArgs {
    pub device: ServerIdentity,
    pub semaphore: ServerIdentity,
}

pub fn encode_destroy_semaphore_args(enc: &mut Encoder, args: &DestroySemaphoreArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.semaphore);
}

pub fn decode_destroy_semaphore_args(dec: &mut Decoder) -> DestroySemaphoreArgs {
    DestroySemaphoreArgs {
        device: decode_identity(dec),
        semaphore: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSemaphoreArgs {
    pub device: ServerIdentity,
    pub semaphore: ServerIdentity,
    pub value: u64,
}

pub fn encode_signal_semaphore_args(enc: &mut Encoder, args: &SignalSemaphoreArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.semaphore);
    encode_u64(enc, args.value);
}

pub fn decode_signal_semaphore_args(dec: &mut Decoder) -> SignalSemaphoreArgs {
    SignalSemaphoreArgs {
        device: decode_identity(dec),
        semaphore: decode_identity(dec),
        value: decode_u64(dec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSemaphoresArgs {
    pub device: ServerIdentity,
    pub semaphores: Vec<ServerIdentity>,
    pub values: Vec<u64>,
    pub wait_all: bool,
    pub timeout_ns: u64,
}

pub fn encode_wait_semaphores_args(enc: &mut Encoder, args: &WaitSemaphoresArgs) {
    encode_identity(enc, args.device);
    encode_identity_array(enc, &args.semaphores);
    encode_u32(enc, args.values.len() as u32);
    for v in &args.values {
        encode_u64(enc, *v);
    }
    encode_bool(enc, args.wait_all);
    encode_u64(enc, args.timeout_ns);
}

pub fn decode_wait_semaphores_args(dec: &mut Decoder) -> WaitSemaphoresArgs {
    let device = decode_identity(dec);
    let semaphores = decode_identity_array(dec);
    let count = decode_u32(dec) as usize;
    let mut values = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        values.push(decode_u64(dec));
        if dec.is_fatal() {
            break;
        }
    }
    WaitSemaphoresArgs {
        device,
        semaphores,
        values,
        wait_all: decode_bool(dec),
        timeout_ns: decode_u64(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSemaphoreCounterValueArgs {
    pub device: ServerIdentity,
    pub semaphore: ServerIdentity,
}

pub fn encode_get_semaphore_counter_value_args(enc: &mut Encoder, args: &GetSemaphoreCounterValueArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.semaphore);
}

pub fn decode_get_semaphore_counter_value_args(dec: &mut Decoder) -> GetSemaphoreCounterValueArgs {
    GetSemaphoreCounterValueArgs {
        device: decode_identity(dec),
        semaphore: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSemaphoreCounterValueReply {
    pub result: i32,
    pub value: u64,
}

pub fn encode_get_semaphore_counter_value_reply(enc: &mut Encoder, reply: &GetSemaphoreCounterValueReply) {
    encode_i32(enc, reply.result);
    encode_u64(enc, reply.value);
}

pub fn decode_get_semaphore_counter_value_reply(dec: &mut Decoder) -> GetSemaphoreCounterValueReply {
    GetSemaphoreCounterValueReply {
        result: decode_i32(dec),
        value: decode_u64(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateEventArgs {
    pub device: ServerIdentity,
}

pub fn encode_create_event_args(enc: &mut Encoder, args: &CreateEventArgs) {
    encode_identity(enc, args.device);
}

pub fn decode_create_event_args(dec: &mut Decoder) -> CreateEventArgs {
    CreateEventArgs {
        device: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateEventReply {
    pub result: i32,
    pub event: ServerIdentity,
}

pub fn encode_create_event_reply(enc: &mut Encoder, reply: &CreateEventReply) {
    encode_i32(enc, reply.result);
    encode_identity(enc, reply.event);
}

pub fn decode_create_event_reply(dec: &mut Decoder) -> CreateEventReply {
    CreateEventReply {
        result: decode_i32(dec),
        event: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventArgs {
    pub device: ServerIdentity,
    pub event: ServerIdentity,
}

pub fn encode_event_args(enc: &mut Encoder, args: &EventArgs) {
    encode_identity(enc, args.device);
    encode_identity(enc, args.event);
}

pub fn decode_event_args(dec: &mut Decoder) -> EventArgs {
    EventArgs {
        device: decode_identity(dec),
        event: decode_identity(dec),
    }
}

/// One batch of a `vkQueueSubmit` call: the command buffers to execute plus
/// the wait/signal semaphores bracketing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitInfo {
    pub wait_semaphores: Vec<ServerIdentity>,
    pub wait_values: Vec<u64>,
    pub wait_stage_masks: Vec<u32>,
    pub command_buffers: Vec<ServerIdentity>,
    pub signal_semaphores: Vec<ServerIdentity>,
    pub signal_values: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSubmitArgs {
    pub queue: ServerIdentity,
    pub submits: Vec<SubmitInfo>,
    pub fence: Option<ServerIdentity>,
}

pub fn encode_queue_submit_args(enc: &mut Encoder, args: &QueueSubmitArgs) {
    encode_identity(enc, args.queue);
    encode_u32(enc, args.submits.len() as u32);
    for submit in &args.submits {
        encode_identity_array(enc, &submit.wait_semaphores);
        encode_u32(enc, submit.wait_values.len() as u32);
        for v in &submit.wait_values {
            encode_u64(enc, *v);
        }
        encode_u32_array(enc, &submit.wait_stage_masks);
        encode_identity_array(enc, &submit.command_buffers);
        encode_identity_array(enc, &submit.signal_semaphores);
        encode_u32(enc, submit.signal_values.len() as u32);
        for v in &submit.signal_values {
            encode_u64(enc, *v);
        }
    }
    encode_optional_identity(enc, args.fence);
}

pub fn decode_queue_submit_args(dec: &mut Decoder) -> QueueSubmitArgs {
    let queue = decode_identity(dec);
    let submit_count = decode_u32(dec) as usize;
    let mut submits = Vec::with_capacity(submit_count.min(256));
    for _ in 0..submit_count {
        let wait_semaphores = decode_identity_array(dec);
        let wait_value_count = decode_u32(dec) as usize;
        let mut wait_values = Vec::with_capacity(wait_value_count.min(1024));
        for _ in 0..wait_value_count {
            wait_values.push(decode_u64(dec));
            if dec.is_fatal() {
                break;
            }
        }
        let wait_stage_masks = decode_u32_array(dec);
        let command_buffers = decode_identity_array(dec);
        let signal_semaphores = decode_identity_array(dec);
        let signal_value_count = decode_u32(dec) as usize;
        let mut signal_values = Vec::with_capacity(signal_value_count.min(1024));
        for _ in 0..signal_value_count {
            signal_values.push(decode_u64(dec));
            if dec.is_fatal() {
                break;
            }
        }
        submits.push(SubmitInfo {
            wait_semaphores,
            wait_values,
            wait_stage_masks,
            command_buffers,
            signal_semaphores,
            signal_values,
        });
        if dec.is_fatal() {
            break;
        }
    }
    let fence = decode_optional_identity(dec);
    QueueSubmitArgs {
        queue,
        submits,
        fence,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueWaitIdleArgs {
    pub queue: ServerIdentity,
}

pub fn encode_queue_wait_idle_args(enc: &mut Encoder, args: &QueueWaitIdleArgs) {
    encode_identity(enc, args.queue);
}

pub fn decode_queue_wait_idle_args(dec: &mut Decoder) -> QueueWaitIdleArgs {
    QueueWaitIdleArgs {
        queue: decode_identity(dec),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceWaitIdleArgs {
    pub device: ServerIdentity,
}

pub fn encode_device_wait_idle_args(enc: &mut Encoder, args: &DeviceWaitIdleArgs) {
    encode_identity(enc, args.device);
}

pub fn decode_device_wait_idle_args(dec: &mut Decoder) -> DeviceWaitIdleArgs {
    DeviceWaitIdleArgs {
        device: decode_identity(dec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_for_fences_round_trips() {
        let args = WaitForFencesArgs {
            device: ServerIdentity(1),
            fences: vec![ServerIdentity(2), ServerIdentity(3)],
            wait_all: true,
            timeout_ns: u64::MAX,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_wait_for_fences_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_wait_for_fences_args(&mut dec), args);
    }

    #[test]
    fn sync_result_reply_round_trips() {
        let reply = SyncResultReply { result: 0 };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_sync_result_reply(&mut enc, &reply);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_sync_result_reply(&mut dec), reply);
    }

    #[test]
    fn semaphore_counter_value_reply_round_trips() {
        let reply = GetSemaphoreCounterValueReply { result: 0, value: 42 };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_get_semaphore_counter_value_reply(&mut enc, &reply);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_get_semaphore_counter_value_reply(&mut dec), reply);
    }

    #[test]
    fn queue_submit_round_trips_with_fence() {
        let args = QueueSubmitArgs {
            queue: ServerIdentity(4),
            submits: vec![SubmitInfo {
                wait_semaphores: vec![ServerIdentity(5)],
                wait_values: vec![1],
                wait_stage_masks: vec![0x400],
                command_buffers: vec![ServerIdentity(6)],
                signal_semaphores: vec![ServerIdentity(7)],
                signal_values: vec![2],
            }],
            fence: Some(ServerIdentity(8)),
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_queue_submit_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_queue_submit_args(&mut dec), args);
    }

    #[test]
    fn queue_submit_round_trips_without_fence() {
        let args = QueueSubmitArgs {
            queue: ServerIdentity(4),
            submits: vec![],
            fence: None,
        };
        let mut enc = Encoder::dynamic();
        enc.acquire();
        encode_queue_submit_args(&mut enc, &args);
        let mut dec = Decoder::new(enc.data());
        assert_eq!(decode_queue_submit_args(&mut dec), args);
    }
}
