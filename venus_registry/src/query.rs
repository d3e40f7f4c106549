//! Query pool tracking.

use std::collections::HashMap;

use venus_wire::ServerIdentity;

use crate::key::{ClientKey, Device, QueryPool};

pub struct QueryPoolRecord {
    pub device: ClientKey<Device>,
    pub server_identity: ServerIdentity,
    pub query_type: u32,
    pub query_count: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unknown query pool handle")]
    UnknownPool,
    #[error("query range [{first}, {first}+{count}) exceeds pool size {pool_size}")]
    OutOfRange { first: u32, count: u32, pool_size: u32 },
}

#[derive(Default)]
pub struct QueryTracker {
    pools: HashMap<ClientKey<QueryPool>, QueryPoolRecord>,
}

impl QueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pool(&mut self, key: ClientKey<QueryPool>, record: QueryPoolRecord) {
        self.pools.insert(key, record);
    }

    pub fn pool(&self, key: ClientKey<QueryPool>) -> Result<&QueryPoolRecord, QueryError> {
        self.pools.get(&key).ok_or(QueryError::UnknownPool)
    }

    pub fn remove_pool(&mut self, key: ClientKey<QueryPool>) -> Option<QueryPoolRecord> {
        self.pools.remove(&key)
    }

    pub fn remove_device(&mut self, device: ClientKey<Device>) {
        self.pools.retain(|_, record| record.device != device);
    }

    /// Validates that `[first_query, first_query + query_count)` lies
    /// entirely within the pool's allocated query count, catching an
    /// out-of-range `vkCmdBeginQuery`/`vkGetQueryPoolResults` before it
    /// reaches the wire.
    pub fn validate_query_range(
        &self,
        pool: ClientKey<QueryPool>,
        first_query: u32,
        query_count: u32,
    ) -> Result<(), QueryError> {
        let record = self.pool(pool)?;
        if query_count == 0 {
            return Ok(());
        }
        let end = first_query.checked_add(query_count).unwrap_or(u32::MAX);
        if end > record.query_count {
            return Err(QueryError::OutOfRange {
                first: first_query,
                count: query_count,
                pool_size: record.query_count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyAllocator;

    fn fixture() -> (QueryTracker, ClientKey<QueryPool>) {
        let devices: KeyAllocator<Device> = KeyAllocator::new();
        let pools: KeyAllocator<QueryPool> = KeyAllocator::new();
        let device = devices.allocate();
        let pool = pools.allocate();
        let mut tracker = QueryTracker::new();
        tracker.insert_pool(
            pool,
            QueryPoolRecord {
                device,
                server_identity: ServerIdentity(1),
                query_type: 0,
                query_count: 16,
            },
        );
        (tracker, pool)
    }

    #[test]
    fn in_range_query_is_accepted() {
        let (tracker, pool) = fixture();
        assert!(tracker.validate_query_range(pool, 0, 16).is_ok());
        assert!(tracker.validate_query_range(pool, 15, 1).is_ok());
    }

    #[test]
    fn out_of_range_query_is_rejected() {
        let (tracker, pool) = fixture();
        assert!(matches!(
            tracker.validate_query_range(pool, 15, 2),
            Err(QueryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn overflowing_range_does_not_panic() {
        let (tracker, pool) = fixture();
        assert!(matches!(
            tracker.validate_query_range(pool, u32::MAX, 1),
            Err(QueryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn zero_count_is_always_accepted_even_past_pool_size() {
        let (tracker, pool) = fixture();
        assert!(tracker.validate_query_range(pool, 20, 0).is_ok());
        assert!(tracker.validate_query_range(pool, u32::MAX, 0).is_ok());
    }
}
