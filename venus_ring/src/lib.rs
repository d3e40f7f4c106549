//! Submit/ring layer: turns an encode closure and a command id into a wire
//! call, enforcing the rules that don't belong in the codec
//! or the transport -- the stack/heap encoder threshold, the single
//! in-flight reply-bearing call, and the transport-failure-to-device-lost
//! cascade.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use venus_transport::{NetworkClient, TransportError};
use venus_wire::command::{CommandFlags, CommandHeader, CommandId};
use venus_wire::{Decoder, Encoder};

/// Below this payload size an encode is attempted into a stack-allocated
/// buffer first; only a command whose arguments overflow it pays for a
/// heap allocation. Chosen to comfortably fit every fixed-size command in
/// `venus_wire::commands` (the largest is `QueueSubmitArgs` with a small
/// constant number of semaphores) while still catching pathological
/// variable-length arguments before they touch the heap twice.
pub const STACK_ENCODER_THRESHOLD: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("reply payload failed to decode")]
    CodecFatal,
    #[error("the device is lost after a prior transport failure")]
    DeviceLost,
}

/// One ring per transport connection. `call_lock` is the single in-flight
/// reply-bearing call gate: only one thread may have a request in flight
/// awaiting its reply at a time, matching the protocol's requirement that
/// a connection's request and reply streams never interleave two logical
/// calls.
pub struct Ring {
    client: NetworkClient,
    call_lock: Mutex<()>,
    device_lost: AtomicBool,
}

impl Ring {
    pub fn new(client: NetworkClient) -> Self {
        Self {
            client,
            call_lock: Mutex::new(()),
            device_lost: AtomicBool::new(false),
        }
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::SeqCst)
    }

    /// Exposes the underlying transport for callers that need to issue
    /// reserved commands outside the usual encode-closure shape, such as
    /// `venus_shadow`'s memory-transfer push/pull.
    pub fn client(&self) -> &NetworkClient {
        &self.client
    }

    fn check_device_lost(&self) -> Result<(), RingError> {
        if self.is_device_lost() {
            return Err(RingError::DeviceLost);
        }
        Ok(())
    }

    fn mark_device_lost(&self) {
        self.device_lost.store(true, Ordering::SeqCst);
    }

    /// Encodes a command header plus body, trying a fixed-size stack
    /// buffer first and falling back to a heap-backed encoder only if the
    /// body overflows it.
    fn encode_command(id: CommandId, flags: CommandFlags, body: &dyn Fn(&mut Encoder)) -> Vec<u8> {
        let mut stack_buf = [0u8; STACK_ENCODER_THRESHOLD];
        {
            let mut enc = Encoder::external(&mut stack_buf);
            enc.acquire();
            CommandHeader::new(id, flags).encode(&mut enc);
            body(&mut enc);
            if !enc.is_fatal() {
                return enc.data().to_vec();
            }
        }
        let mut enc = Encoder::dynamic();
        enc.acquire();
        CommandHeader::new(id, flags).encode(&mut enc);
        body(&mut enc);
        enc.data().to_vec()
    }

    /// Sends a command that expects no reply.
    pub fn send(&self, id: CommandId, flags: CommandFlags, body: impl Fn(&mut Encoder)) -> Result<(), RingError> {
        self.check_device_lost()?;
        let payload = Self::encode_command(id, flags, &body);
        self.client.send(&payload).map_err(|e| {
            self.mark_device_lost();
            RingError::Transport(e)
        })
    }

    /// Sends a command and blocks for its reply, decoding it with
    /// `decode`. A fatal decode is reported distinctly from a transport
    /// failure: the connection is still alive, just this one reply was
    /// malformed.
    pub fn call<T>(
        &self,
        id: CommandId,
        flags: CommandFlags,
        body: impl Fn(&mut Encoder),
        decode: impl FnOnce(&mut Decoder) -> T,
    ) -> Result<T, RingError> {
        self.check_device_lost()?;
        let payload = Self::encode_command(id, flags | CommandFlags::REPLY_EXPECTED, &body);
        let _guard = self.call_lock.lock();
        let reply_bytes = self.client.call(&payload).map_err(|e| {
            self.mark_device_lost();
            RingError::Transport(e)
        })?;
        let mut dec = Decoder::new(&reply_bytes);
        let value = decode(&mut dec);
        if dec.is_fatal() {
            return Err(RingError::CodecFatal);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use venus_transport::NetworkServer;
    use venus_wire::primitives::{decode_u32, encode_u32};

    #[test]
    fn small_command_fits_the_stack_buffer() {
        let payload = Ring::encode_command(CommandId::CREATE_FENCE, CommandFlags::empty(), &|enc| {
            encode_u32(enc, 42);
        });
        assert!(payload.len() < STACK_ENCODER_THRESHOLD);
    }

    #[test]
    fn oversized_command_falls_back_to_heap() {
        let payload = Ring::encode_command(CommandId::CREATE_FENCE, CommandFlags::empty(), &|enc| {
            for _ in 0..200 {
                encode_u32(enc, 0xAAAA_AAAA);
            }
        });
        assert!(payload.len() > STACK_ENCODER_THRESHOLD);
    }

    #[test]
    fn call_round_trips_and_single_flight_lock_does_not_deadlock() {
        let server = NetworkServer::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let server = Arc::new(server);
        let server_clone = server.clone();
        let handle = std::thread::spawn(move || {
            server_clone.accept_one(|payload| {
                let mut dec = Decoder::new(payload);
                let header = CommandHeader::decode(&mut dec);
                assert_eq!(header.id, CommandId::CREATE_FENCE);
                let value = decode_u32(&mut dec);
                let mut enc = Encoder::dynamic();
                enc.acquire();
                encode_u32(&mut enc, value + 1);
                Some(enc.data().to_vec())
            })
        });
        let client = venus_transport::NetworkClient::connect(addr).unwrap();
        let ring = Ring::new(client);
        let result = ring
            .call(
                CommandId::CREATE_FENCE,
                CommandFlags::empty(),
                |enc| encode_u32(enc, 41),
                |dec| decode_u32(dec),
            )
            .unwrap();
        assert_eq!(result, 42);
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn failed_transport_marks_device_lost_for_subsequent_calls() {
        let server = NetworkServer::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        let server = Arc::new(server);
        let server_clone = server.clone();
        let handle = std::thread::spawn(move || server_clone.accept_one(|payload| Some(payload.to_vec())));
        let client = venus_transport::NetworkClient::connect(addr).unwrap();
        let ring = Ring::new(client);
        ring.client.disconnect().unwrap();
        let result = ring.send(CommandId::CREATE_FENCE, CommandFlags::empty(), |_| {});
        assert!(result.is_err());
        assert!(ring.is_device_lost());
        handle.join().unwrap().unwrap();
    }
}
