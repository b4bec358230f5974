//! Lock-free per-thread slot pool.
//!
//! Medium payloads (at most [`POOL_SLOT_SIZE`] bytes) are served from a
//! shard of preallocated slots owned by the allocating thread. Each shard
//! keeps its free slots on an intrusive lock-free stack:
//!
//! - `acquire` pops the calling thread's free head. Only the owning thread
//!   pops, so the pop CAS cannot observe an ABA'd head.
//! - releasing a [`PoolSlot`] pushes the slot back onto the shard it came
//!   from, from whatever thread drops it. Pushes from foreign threads CAS
//!   against concurrent pushes and the owner's pops.
//!
//! When a shard runs dry the caller falls back to the general allocator;
//! the fallback is counted so steady-state workloads can verify the fast
//! path dominates.

// Layer 1: Standard library imports
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Byte size of one pooled slot (the medium size-class upper bound).
pub const POOL_SLOT_SIZE: usize = 1024;

/// Slots preallocated per thread shard.
pub const POOL_SLOTS_PER_SHARD: usize = 256;

/// Sentinel for "no slot" in the free list (indices are offset by one).
const NIL: u32 = 0;

struct Shard {
    /// Top of the free stack, stored as `index + 1` so zero means empty.
    free_head: AtomicU32,
    /// Next pointers of the intrusive free stack, same `index + 1` encoding.
    next: Box<[AtomicU32]>,
    /// Slot storage. A slot is only touched by the handle that owns it
    /// between `acquire` and drop, so plain interior mutability suffices.
    slots: Box<[UnsafeCell<[u8; POOL_SLOT_SIZE]>]>,
    fast_allocs: AtomicU64,
    slow_allocs: AtomicU64,
    frees: AtomicU64,
}

// Safety: the free list is maintained with atomics; slot payload bytes are
// exclusively owned by the live PoolSlot handle (single writer/reader).
unsafe impl Send for Shard {}
unsafe impl Sync for Shard {}

impl Shard {
    fn new() -> Arc<Self> {
        let mut next = Vec::with_capacity(POOL_SLOTS_PER_SHARD);
        for i in 0..POOL_SLOTS_PER_SHARD as u32 {
            // Slot i links to slot i+1; the last links to NIL.
            let link = if (i as usize) + 1 < POOL_SLOTS_PER_SHARD { i + 2 } else { NIL };
            next.push(AtomicU32::new(link));
        }
        let mut slots = Vec::with_capacity(POOL_SLOTS_PER_SHARD);
        slots.resize_with(POOL_SLOTS_PER_SHARD, || UnsafeCell::new([0u8; POOL_SLOT_SIZE]));

        Arc::new(Self {
            free_head: AtomicU32::new(1),
            next: next.into_boxed_slice(),
            slots: slots.into_boxed_slice(),
            fast_allocs: AtomicU64::new(0),
            slow_allocs: AtomicU64::new(0),
            frees: AtomicU64::new(0),
        })
    }

    /// Pop the free head. Called only from the shard's owning thread.
    fn pop(&self) -> Option<u32> {
        // Acquire pairs with the Release in `push`, making the freed slot's
        // final state visible before it is handed out again.
        let mut head = self.free_head.load(Ordering::Acquire);
        loop {
            if head == NIL {
                return None;
            }
            let idx = head - 1;
            let next = self.next[idx as usize].load(Ordering::Relaxed);
            match self.free_head.compare_exchange_weak(
                head,
                next,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(idx),
                // Lost a race against a concurrent push; retry with the
                // observed head. Only this thread pops, so the head cannot
                // be re-linked underneath the CAS.
                Err(observed) => head = observed,
            }
        }
    }

    /// Push a slot back. Callable from any thread.
    fn push(&self, idx: u32) {
        let mut head = self.free_head.load(Ordering::Relaxed);
        loop {
            self.next[idx as usize].store(head, Ordering::Relaxed);
            // Release publishes the link (and the dropped slot contents)
            // to the owner's Acquire pop.
            match self.free_head.compare_exchange_weak(
                head,
                idx + 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => head = observed,
            }
        }
    }
}

thread_local! {
    static SHARD: Arc<Shard> = Shard::new();
}

/// Allocation counters for one thread's shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Pooled allocations served from the free list.
    pub fast_allocs: u64,
    /// Requests that fell through to the general allocator.
    pub slow_allocs: u64,
    /// Slots returned to the pool.
    pub frees: u64,
}

/// Counters for the calling thread's shard.
pub fn thread_stats() -> PoolStats {
    SHARD.with(|shard| PoolStats {
        fast_allocs: shard.fast_allocs.load(Ordering::Relaxed),
        slow_allocs: shard.slow_allocs.load(Ordering::Relaxed),
        frees: shard.frees.load(Ordering::Relaxed),
    })
}

/// Try to take a slot from the calling thread's shard.
///
/// Returns `None` when the shard is exhausted; the caller is expected to
/// fall back to the heap. The miss is counted either way.
pub fn acquire() -> Option<PoolSlot> {
    SHARD.with(|shard| match shard.pop() {
        Some(index) => {
            shard.fast_allocs.fetch_add(1, Ordering::Relaxed);
            Some(PoolSlot {
                shard: Arc::clone(shard),
                index,
            })
        }
        None => {
            shard.slow_allocs.fetch_add(1, Ordering::Relaxed);
            None
        }
    })
}

/// Exclusive handle to one pooled slot.
///
/// The slot returns to its owning shard when the handle drops, from any
/// thread. Holding the handle grants exclusive access to the slot bytes.
pub struct PoolSlot {
    shard: Arc<Shard>,
    index: u32,
}

impl PoolSlot {
    /// The slot bytes.
    pub fn bytes(&self) -> &[u8; POOL_SLOT_SIZE] {
        // Safety: exclusive ownership of the slot between acquire and drop.
        unsafe { &*self.shard.slots[self.index as usize].get() }
    }

    /// The slot bytes, writable.
    pub fn bytes_mut(&mut self) -> &mut [u8; POOL_SLOT_SIZE] {
        // Safety: exclusive ownership of the slot between acquire and drop.
        unsafe { &mut *self.shard.slots[self.index as usize].get() }
    }
}

impl std::fmt::Debug for PoolSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolSlot").field("index", &self.index).finish()
    }
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        self.shard.frees.fetch_add(1, Ordering::Relaxed);
        self.shard.push(self.index);
    }
}

// Safety: the handle owns its slot exclusively and releases it with a CAS
// push that is valid from any thread.
unsafe impl Send for PoolSlot {}
unsafe impl Sync for PoolSlot {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_roundtrip() {
        let before = thread_stats();
        {
            let mut slot = acquire().unwrap();
            slot.bytes_mut()[0] = 0xAB;
            assert_eq!(slot.bytes()[0], 0xAB);
        }
        let after = thread_stats();
        assert_eq!(after.fast_allocs, before.fast_allocs + 1);
        assert_eq!(after.frees, before.frees + 1);
    }

    #[test]
    fn test_exhaustion_counts_slow_path() {
        let mut held = Vec::new();
        while let Some(slot) = acquire() {
            held.push(slot);
            if held.len() > POOL_SLOTS_PER_SHARD {
                break;
            }
        }
        assert!(held.len() <= POOL_SLOTS_PER_SHARD);

        let before = thread_stats();
        assert!(acquire().is_none());
        let after = thread_stats();
        assert_eq!(after.slow_allocs, before.slow_allocs + 1);

        drop(held);
        assert!(acquire().is_some());
    }

    #[test]
    fn test_cross_thread_release() {
        let slots: Vec<PoolSlot> = (0..8).map(|_| acquire().unwrap()).collect();
        let before = thread_stats();

        std::thread::spawn(move || drop(slots)).join().unwrap();

        // The freeing thread pushed back into this thread's shard; all
        // eight slots are allocatable again.
        let mut reclaimed = Vec::new();
        for _ in 0..8 {
            reclaimed.push(acquire().unwrap());
        }
        let after = thread_stats();
        assert_eq!(after.fast_allocs, before.fast_allocs + 8);
    }

    #[test]
    fn test_slots_are_distinct() {
        let mut a = acquire().unwrap();
        let mut b = acquire().unwrap();
        a.bytes_mut()[0] = 1;
        b.bytes_mut()[0] = 2;
        assert_eq!(a.bytes()[0], 1);
        assert_eq!(b.bytes()[0], 2);
    }

    #[test]
    fn test_concurrent_release_storm() {
        // Drain a batch, scatter the handles across threads, ensure the
        // free list survives the concurrent pushes.
        let slots: Vec<PoolSlot> = (0..64).map(|_| acquire().unwrap()).collect();
        let handles: Vec<_> = slots
            .into_iter()
            .map(|slot| std::thread::spawn(move || drop(slot)))
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let reclaimed: Vec<PoolSlot> = (0..64).map(|_| acquire().unwrap()).collect();
        assert_eq!(reclaimed.len(), 64);
    }
}
