//! Fence, semaphore and event tracking.
//!
//! Event tracking is implemented to the same shape as fences and
//! semaphores but `venus_driver` never calls into it -- preserved as a
//! reachable tracker and wire surface rather than invented a new use for
//! a feature nothing else in this workspace exercises.

use std::collections::HashMap;

use venus_wire::ServerIdentity;

use crate::key::{ClientKey, Device, Event, Fence, Semaphore};

pub struct FenceRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub signaled: bool,
}

pub struct SemaphoreRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub is_timeline: bool,
    pub value: u64,
}

pub struct EventRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub signaled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("unknown fence handle")]
    UnknownFence,
    #[error("unknown semaphore handle")]
    UnknownSemaphore,
    #[error("unknown event handle")]
    UnknownEvent,
    #[error("semaphore is binary, not timeline")]
    NotTimeline,
    #[error("timeline semaphore value must strictly increase: current {current}, signalled {attempted}")]
    NonMonotonicSignal { current: u64, attempted: u64 },
}

#[derive(Default)]
pub struct SyncTracker {
    fences: HashMap<ClientKey<Fence>, FenceRecord>,
    semaphores: HashMap<ClientKey<Semaphore>, SemaphoreRecord>,
    events: HashMap<ClientKey<Event>, EventRecord>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_fence(&mut self, key: ClientKey<Fence>, record: FenceRecord) {
        self.fences.insert(key, record);
    }

    pub fn fence(&self, key: ClientKey<Fence>) -> Result<&FenceRecord, SyncError> {
        self.fences.get(&key).ok_or(SyncError::UnknownFence)
    }

    pub fn set_fence_signaled(&mut self, key: ClientKey<Fence>, signaled: bool) -> Result<(), SyncError> {
        let record = self.fences.get_mut(&key).ok_or(SyncError::UnknownFence)?;
        record.signaled = signaled;
        Ok(())
    }

    pub fn reset_fences(&mut self, keys: &[ClientKey<Fence>]) -> Result<(), SyncError> {
        for key in keys {
            self.set_fence_signaled(*key, false)?;
        }
        Ok(())
    }

    pub fn remove_fence(&mut self, key: ClientKey<Fence>) -> Option<FenceRecord> {
        self.fences.remove(&key)
    }

    pub fn insert_semaphore(&mut self, key: ClientKey<Semaphore>, record: SemaphoreRecord) {
        self.semaphores.insert(key, record);
    }

    pub fn semaphore(&self, key: ClientKey<Semaphore>) -> Result<&SemaphoreRecord, SyncError> {
        self.semaphores.get(&key).ok_or(SyncError::UnknownSemaphore)
    }

    /// Advances a timeline semaphore's locally cached counter value.
    /// Rejects a non-increasing value: the server is the source of truth
    /// for *whether* a wait is satisfied, but the client still must never
    /// observe its own cached counter run backwards.
    pub fn signal_semaphore(&mut self, key: ClientKey<Semaphore>, value: u64) -> Result<(), SyncError> {
        let record = self.semaphores.get_mut(&key).ok_or(SyncError::UnknownSemaphore)?;
        if !record.is_timeline {
            return Err(SyncError::NotTimeline);
        }
        if value <= record.value {
            return Err(SyncError::NonMonotonicSignal {
                current: record.value,
                attempted: value,
            });
        }
        record.value = value;
        Ok(())
    }

    pub fn remove_semaphore(&mut self, key: ClientKey<Semaphore>) -> Option<SemaphoreRecord> {
        self.semaphores.remove(&key)
    }

    pub fn insert_event(&mut self, key: ClientKey<Event>, record: EventRecord) {
        self.events.insert(key, record);
    }

    pub fn event(&self, key: ClientKey<Event>) -> Result<&EventRecord, SyncError> {
        self.events.get(&key).ok_or(SyncError::UnknownEvent)
    }

    pub fn set_event_signaled(&mut self, key: ClientKey<Event>, signaled: bool) -> Result<(), SyncError> {
        let record = self.events.get_mut(&key).ok_or(SyncError::UnknownEvent)?;
        record.signaled = signaled;
        Ok(())
    }

    pub fn remove_event(&mut self, key: ClientKey<Event>) -> Option<EventRecord> {
        self.events.remove(&key)
    }

    pub fn remove_device(&mut self, device: ClientKey<Device>) {
        self.fences.retain(|_, r| r.device != device);
        self.semaphores.retain(|_, r| r.device != device);
        self.events.retain(|_, r| r.device != device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyAllocator;

    fn device_key() -> ClientKey<Device> {
        let devices: KeyAllocator<Device> = KeyAllocator::new();
        devices.allocate()
    }

    #[test]
    fn timeline_semaphore_rejects_non_increasing_signal() {
        let semaphores: KeyAllocator<Semaphore> = KeyAllocator::new();
        let key = semaphores.allocate();
        let mut tracker = SyncTracker::new();
        tracker.insert_semaphore(
            key,
            SemaphoreRecord {
                device: device_key(),
                server_identity: ServerIdentity(1),
                is_timeline: true,
                value: 5,
            },
        );
        tracker.signal_semaphore(key, 6).unwrap();
        assert!(matches!(
            tracker.signal_semaphore(key, 6),
            Err(SyncError::NonMonotonicSignal { current: 6, attempted: 6 })
        ));
        assert!(matches!(
            tracker.signal_semaphore(key, 3),
            Err(SyncError::NonMonotonicSignal { .. })
        ));
    }

    #[test]
    fn binary_semaphore_rejects_signal() {
        let semaphores: KeyAllocator<Semaphore> = KeyAllocator::new();
        let key = semaphores.allocate();
        let mut tracker = SyncTracker::new();
        tracker.insert_semaphore(
            key,
            SemaphoreRecord {
                device: device_key(),
                server_identity: ServerIdentity(1),
                is_timeline: false,
                value: 0,
            },
        );
        assert!(matches!(tracker.signal_semaphore(key, 1), Err(SyncError::NotTimeline)));
    }

    #[test]
    fn reset_fences_clears_signaled_state() {
        let fences: KeyAllocator<Fence> = KeyAllocator::new();
        let key = fences.allocate();
        let mut tracker = SyncTracker::new();
        tracker.insert_fence(
            key,
            FenceRecord {
                device: device_key(),
                server_identity: ServerIdentity(1),
                signaled: true,
            },
        );
        tracker.reset_fences(&[key]).unwrap();
        assert!(!tracker.fence(key).unwrap().signaled);
    }

    #[test]
    fn remove_device_cascades_across_fences_semaphores_events() {
        let device = device_key();
        let fences: KeyAllocator<Fence> = KeyAllocator::new();
        let fence = fences.allocate();
        let mut tracker = SyncTracker::new();
        tracker.insert_fence(
            fence,
            FenceRecord {
                device,
                server_identity: ServerIdentity(1),
                signaled: false,
            },
        );
        tracker.remove_device(device);
        assert!(tracker.fence(fence).is_err());
    }
}
