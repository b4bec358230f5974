//! Per-thread size-class allocation for medium message payloads.

mod pool;

pub use pool::{acquire, thread_stats, PoolSlot, PoolStats, POOL_SLOTS_PER_SHARD, POOL_SLOT_SIZE};
