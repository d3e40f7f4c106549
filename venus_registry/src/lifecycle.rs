//! Command pool / command buffer lifecycle state machine.

use std::collections::HashMap;

use venus_wire::ServerIdentity;

use crate::key::{ClientKey, CommandBuffer, CommandPool, Device};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    Initial,
    Recording,
    Executable,
    Invalid,
}

pub struct CommandPoolRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub command_buffers: Vec<ClientKey<CommandBuffer>>,
}

pub struct CommandBufferRecord {
    pub pool: ClientKey<CommandPool>,
    pub server_identity: ServerIdentity,
    pub state: CommandBufferState,
    /// Last descriptor-set bind recorded in the current recording scope,
    /// keyed by `(pipeline_bind_point, first_set)` -- the snapshot is kept
    /// per bind point, so binding GRAPHICS then COMPUTE at the same
    /// `first_set` never reads as a repeat of each other. Used to elide a
    /// redundant re-bind.
    last_descriptor_binds: HashMap<(u32, u32), (ServerIdentity, Vec<ServerIdentity>, Vec<u32>)>,
}

impl CommandBufferRecord {
    pub fn new(pool: ClientKey<CommandPool>, server_identity: ServerIdentity) -> Self {
        Self {
            pool,
            server_identity,
            state: CommandBufferState::Initial,
            last_descriptor_binds: HashMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("unknown command pool handle")]
    UnknownPool,
    #[error("unknown command buffer handle")]
    UnknownCommandBuffer,
    #[error("vkBeginCommandBuffer requires the buffer to be in the Initial state, found {0:?}")]
    BeginRequiresInitial(CommandBufferState),
    #[error("vkEndCommandBuffer requires the buffer to be in the Recording state, found {0:?}")]
    EndRequiresRecording(CommandBufferState),
    #[error("command buffer must be Executable to submit, found {0:?}")]
    SubmitRequiresExecutable(CommandBufferState),
    #[error("recording commands requires the buffer to be in the Recording state, found {0:?}")]
    RecordRequiresRecording(CommandBufferState),
}

#[derive(Default)]
pub struct LifecycleTracker {
    pools: HashMap<ClientKey<CommandPool>, CommandPoolRecord>,
    command_buffers: HashMap<ClientKey<CommandBuffer>, CommandBufferRecord>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pool(&mut self, key: ClientKey<CommandPool>, record: CommandPoolRecord) {
        self.pools.insert(key, record);
    }

    pub fn pool(&self, key: ClientKey<CommandPool>) -> Result<&CommandPoolRecord, LifecycleError> {
        self.pools.get(&key).ok_or(LifecycleError::UnknownPool)
    }

    pub fn insert_command_buffer(&mut self, key: ClientKey<CommandBuffer>, record: CommandBufferRecord) {
        if let Some(pool) = self.pools.get_mut(&record.pool) {
            pool.command_buffers.push(key);
        }
        self.command_buffers.insert(key, record);
    }

    pub fn command_buffer(&self, key: ClientKey<CommandBuffer>) -> Result<&CommandBufferRecord, LifecycleError> {
        self.command_buffers
            .get(&key)
            .ok_or(LifecycleError::UnknownCommandBuffer)
    }

    pub fn begin(&mut self, key: ClientKey<CommandBuffer>) -> Result<(), LifecycleError> {
        let record = self
            .command_buffers
            .get_mut(&key)
            .ok_or(LifecycleError::UnknownCommandBuffer)?;
        if !matches!(record.state, CommandBufferState::Initial) {
            return Err(LifecycleError::BeginRequiresInitial(record.state));
        }
        record.state = CommandBufferState::Recording;
        record.last_descriptor_binds.clear();
        Ok(())
    }

    pub fn end(&mut self, key: ClientKey<CommandBuffer>) -> Result<(), LifecycleError> {
        let record = self
            .command_buffers
            .get_mut(&key)
            .ok_or(LifecycleError::UnknownCommandBuffer)?;
        if !matches!(record.state, CommandBufferState::Recording) {
            return Err(LifecycleError::EndRequiresRecording(record.state));
        }
        record.state = CommandBufferState::Executable;
        Ok(())
    }

    pub fn require_recording(&self, key: ClientKey<CommandBuffer>) -> Result<(), LifecycleError> {
        let record = self.command_buffer(key)?;
        if !matches!(record.state, CommandBufferState::Recording) {
            return Err(LifecycleError::RecordRequiresRecording(record.state));
        }
        Ok(())
    }

    pub fn require_executable(&self, key: ClientKey<CommandBuffer>) -> Result<(), LifecycleError> {
        let record = self.command_buffer(key)?;
        if !matches!(record.state, CommandBufferState::Executable) {
            return Err(LifecycleError::SubmitRequiresExecutable(record.state));
        }
        Ok(())
    }

    pub fn reset_command_buffer(&mut self, key: ClientKey<CommandBuffer>) -> Result<(), LifecycleError> {
        let record = self
            .command_buffers
            .get_mut(&key)
            .ok_or(LifecycleError::UnknownCommandBuffer)?;
        record.state = CommandBufferState::Initial;
        record.last_descriptor_binds.clear();
        Ok(())
    }

    pub fn reset_pool(&mut self, key: ClientKey<CommandPool>) -> Result<(), LifecycleError> {
        let buffers = self.pool(key)?.command_buffers.clone();
        for cb in buffers {
            if let Some(record) = self.command_buffers.get_mut(&cb) {
                record.state = CommandBufferState::Initial;
                record.last_descriptor_binds.clear();
            }
        }
        Ok(())
    }

    pub fn free_command_buffers(&mut self, pool: ClientKey<CommandPool>, buffers: &[ClientKey<CommandBuffer>]) {
        for cb in buffers {
            self.command_buffers.remove(cb);
        }
        if let Some(pool_record) = self.pools.get_mut(&pool) {
            pool_record.command_buffers.retain(|cb| !buffers.contains(cb));
        }
    }

    pub fn remove_pool(&mut self, key: ClientKey<CommandPool>) -> Option<CommandPoolRecord> {
        if let Some(record) = self.pools.remove(&key) {
            for cb in &record.command_buffers {
                self.command_buffers.remove(cb);
            }
            Some(record)
        } else {
            None
        }
    }

    /// Device-lost cascade: every command buffer this tracker
    /// knows about, regardless of which device it belongs to, moves to
    /// `Invalid` and drops its descriptor-bind cache. A lost ring takes
    /// down the whole connection, not just one device, so there is no
    /// narrower scope to cascade within.
    pub fn mark_all_invalid(&mut self) {
        for record in self.command_buffers.values_mut() {
            record.state = CommandBufferState::Invalid;
            record.last_descriptor_binds.clear();
        }
    }

    pub fn remove_device(&mut self, device: ClientKey<Device>) {
        let pools: Vec<_> = self
            .pools
            .iter()
            .filter(|(_, record)| record.device == device)
            .map(|(key, _)| *key)
            .collect();
        for pool in pools {
            self.remove_pool(pool);
        }
    }

    /// Records a descriptor-set bind and returns `true` if it is identical
    /// to the last bind at the same `(pipeline_bind_point, first_set)`
    /// within the current recording scope -- the driver can elide
    /// re-encoding it. Identical `(sets, offsets)` at the same `first_set`
    /// but a different bind point (or a different `pipeline_layout`) is
    /// never a repeat.
    #[allow(clippy::too_many_arguments)]
    pub fn record_descriptor_bind(
        &mut self,
        key: ClientKey<CommandBuffer>,
        pipeline_bind_point: u32,
        pipeline_layout: ServerIdentity,
        first_set: u32,
        descriptor_sets: &[ServerIdentity],
        dynamic_offsets: &[u32],
    ) -> Result<bool, LifecycleError> {
        let record = self
            .command_buffers
            .get_mut(&key)
            .ok_or(LifecycleError::UnknownCommandBuffer)?;
        if !matches!(record.state, CommandBufferState::Recording) {
            return Err(LifecycleError::RecordRequiresRecording(record.state));
        }
        let cache_key = (pipeline_bind_point, first_set);
        let is_redundant = record
            .last_descriptor_binds
            .get(&cache_key)
            .is_some_and(|(layout, sets, offsets)| *layout == pipeline_layout && sets == descriptor_sets && offsets == dynamic_offsets);
        if !is_redundant {
            record
                .last_descriptor_binds
                .insert(cache_key, (pipeline_layout, descriptor_sets.to_vec(), dynamic_offsets.to_vec()));
        }
        Ok(is_redundant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyAllocator;

    fn fixture() -> (LifecycleTracker, ClientKey<CommandPool>, ClientKey<CommandBuffer>) {
        let devices: KeyAllocator<Device> = KeyAllocator::new();
        let pools: KeyAllocator<CommandPool> = KeyAllocator::new();
        let buffers: KeyAllocator<CommandBuffer> = KeyAllocator::new();
        let device = devices.allocate();
        let pool = pools.allocate();
        let cb = buffers.allocate();
        let mut tracker = LifecycleTracker::new();
        tracker.insert_pool(
            pool,
            CommandPoolRecord {
                device,
                server_identity: ServerIdentity(1),
                command_buffers: Vec::new(),
            },
        );
        tracker.insert_command_buffer(cb, CommandBufferRecord::new(pool, ServerIdentity(2)));
        (tracker, pool, cb)
    }

    #[test]
    fn end_drives_recording_to_executable() {
        let (mut tracker, _pool, cb) = fixture();
        tracker.begin(cb).unwrap();
        assert_eq!(tracker.command_buffer(cb).unwrap().state, CommandBufferState::Recording);
        tracker.end(cb).unwrap();
        assert_eq!(tracker.command_buffer(cb).unwrap().state, CommandBufferState::Executable);
    }

    #[test]
    fn end_without_begin_is_rejected() {
        let (mut tracker, _pool, cb) = fixture();
        assert!(matches!(
            tracker.end(cb),
            Err(LifecycleError::EndRequiresRecording(CommandBufferState::Initial))
        ));
    }

    #[test]
    fn reset_pool_resets_every_buffer_to_initial() {
        let (mut tracker, pool, cb) = fixture();
        tracker.begin(cb).unwrap();
        tracker.end(cb).unwrap();
        tracker.reset_pool(pool).unwrap();
        assert_eq!(tracker.command_buffer(cb).unwrap().state, CommandBufferState::Initial);
    }

    #[test]
    fn identical_descriptor_bind_is_elided() {
        let (mut tracker, _pool, cb) = fixture();
        tracker.begin(cb).unwrap();
        let layout = ServerIdentity(20);
        let sets = vec![ServerIdentity(10)];
        let first = tracker.record_descriptor_bind(cb, 0, layout, 0, &sets, &[]).unwrap();
        assert!(!first);
        let second = tracker.record_descriptor_bind(cb, 0, layout, 0, &sets, &[]).unwrap();
        assert!(second);
        let different = tracker
            .record_descriptor_bind(cb, 0, layout, 0, &[ServerIdentity(11)], &[])
            .unwrap();
        assert!(!different);
    }

    #[test]
    fn same_sets_at_different_bind_point_is_not_elided() {
        let (mut tracker, _pool, cb) = fixture();
        tracker.begin(cb).unwrap();
        let layout = ServerIdentity(20);
        let sets = vec![ServerIdentity(10)];
        let graphics = tracker.record_descriptor_bind(cb, 0, layout, 0, &sets, &[]).unwrap();
        assert!(!graphics);
        let compute = tracker.record_descriptor_bind(cb, 1, layout, 0, &sets, &[]).unwrap();
        assert!(!compute, "a different pipeline_bind_point must never read as a repeat");
    }

    #[test]
    fn same_sets_with_different_layout_is_not_elided() {
        let (mut tracker, _pool, cb) = fixture();
        tracker.begin(cb).unwrap();
        let sets = vec![ServerIdentity(10)];
        let first = tracker.record_descriptor_bind(cb, 0, ServerIdentity(20), 0, &sets, &[]).unwrap();
        assert!(!first);
        let second = tracker.record_descriptor_bind(cb, 0, ServerIdentity(21), 0, &sets, &[]).unwrap();
        assert!(!second);
    }

    #[test]
    fn mark_all_invalid_cascades_regardless_of_state() {
        let (mut tracker, _pool, cb) = fixture();
        tracker.begin(cb).unwrap();
        tracker.end(cb).unwrap();
        tracker.mark_all_invalid();
        assert_eq!(tracker.command_buffer(cb).unwrap().state, CommandBufferState::Invalid);
    }

    #[test]
    fn descriptor_bind_cache_clears_on_begin() {
        let (mut tracker, _pool, cb) = fixture();
        tracker.begin(cb).unwrap();
        let layout = ServerIdentity(20);
        let sets = vec![ServerIdentity(10)];
        tracker.record_descriptor_bind(cb, 0, layout, 0, &sets, &[]).unwrap();
        tracker.end(cb).unwrap();
        tracker.reset_command_buffer(cb).unwrap();
        tracker.begin(cb).unwrap();
        let redundant = tracker.record_descriptor_bind(cb, 0, layout, 0, &sets, &[]).unwrap();
        assert!(!redundant);
    }
}
