//! Push/pull of shadow contents over the wire using the two reserved
//! memory-transfer commands.
//!
//! Ordering contract: a push must be sent (and, because it's a
//! reply-bearing command, acknowledged) before any command that reads the
//! memory on the server is submitted; a pull must happen after every
//! command writing to the memory has been waited on. Neither this module
//! nor the transport enforces that ordering -- it's `venus_driver`'s job,
//! the same way the ring enforces submission order for everything else.

use venus_transport::{NetworkClient, TransportError};
use venus_wire::command::{CommandFlags, CommandHeader, CommandId};
use venus_wire::commands::memory_transfer::{
    decode_read_memory_data_reply, decode_transfer_memory_data_reply, encode_read_memory_data_args,
    encode_transfer_memory_data_args, ReadMemoryDataArgs, TransferMemoryDataArgs,
};
use venus_wire::{Decoder, Encoder, ServerIdentity};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server rejected the transfer with VkResult {0}")]
    ServerRejected(i32),
}

/// Pushes `data` into the server's copy of `memory` starting at `offset`.
pub fn push(client: &NetworkClient, device: ServerIdentity, memory: ServerIdentity, offset: u64, data: &[u8]) -> Result<(), TransferError> {
    let mut enc = Encoder::dynamic();
    enc.acquire();
    CommandHeader::new(CommandId::TRANSFER_MEMORY_DATA, CommandFlags::REPLY_EXPECTED).encode(&mut enc);
    encode_transfer_memory_data_args(
        &mut enc,
        &TransferMemoryDataArgs {
            device,
            memory,
            offset,
            data: data.to_vec(),
        },
    );
    let reply_bytes = client.call(enc.data())?;
    let mut dec = Decoder::new(&reply_bytes);
    let reply = decode_transfer_memory_data_reply(&mut dec);
    if reply.result != 0 {
        return Err(TransferError::ServerRejected(reply.result));
    }
    Ok(())
}

/// Pulls `size` bytes from the server's copy of `memory` starting at
/// `offset`.
pub fn pull(client: &NetworkClient, device: ServerIdentity, memory: ServerIdentity, offset: u64, size: u64) -> Result<Vec<u8>, TransferError> {
    let mut enc = Encoder::dynamic();
    enc.acquire();
    CommandHeader::new(CommandId::READ_MEMORY_DATA, CommandFlags::REPLY_EXPECTED).encode(&mut enc);
    encode_read_memory_data_args(&mut enc, &ReadMemoryDataArgs { device, memory, offset, size });
    let reply_bytes = client.call(enc.data())?;
    let mut dec = Decoder::new(&reply_bytes);
    let reply = decode_read_memory_data_reply(&mut dec);
    if reply.result != 0 {
        return Err(TransferError::ServerRejected(reply.result));
    }
    Ok(reply.data)
}
