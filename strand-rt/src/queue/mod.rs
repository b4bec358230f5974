//! Lock-free queues: SPSC ring, bounded MPSC, sharded multi-ring,
//! Chase–Lev work-stealing deque, and the priority-laned global queue.
//!
//! Every queue here has a power-of-two capacity and tracks positions with
//! unbounded `u64`/`i64` sequence numbers (buffer indices are `seq & mask`),
//! so wrap-around and ABA are non-issues. Each atomic access documents its
//! ordering at the use site.

pub mod deque;
pub mod global;
pub mod mpsc;
pub mod pad;
pub mod sharded;
pub mod spsc;

pub use deque::{DequeStealer, DequeWorker, Steal};
pub use global::GlobalQueue;
pub use mpsc::{MpscReceiver, MpscSender};
pub use pad::CachePadded;
pub use sharded::{ShardedReceiver, ShardedSender, SHARD_COUNT};
pub use spsc::{SpscConsumer, SpscProducer};

/// Round a requested capacity up to a power of two (at least 2).
pub(crate) fn cap_pow2(capacity: usize) -> usize {
    capacity.next_power_of_two().max(2)
}
