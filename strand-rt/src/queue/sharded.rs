//! Sharded multi-ring queue.
//!
//! Four independent sequence-stamped rings, each with its own cache-padded
//! indices. A sender picks a starting ring by hashing its thread token with
//! the low bits of a nanosecond clock, then retries across rings a bounded
//! number of times before reporting the queue full. The receiver polls
//! rings in index order.
//!
//! # Ordering caveat
//!
//! FIFO holds only per (sender, chosen ring). Because consecutive sends
//! from one sender may land in different rings and the receiver drains
//! rings in index order, **total order is not preserved even for a single
//! sender**. Use this shape for contended fan-in where throughput matters
//! more than cross-message ordering.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::mpsc::{self, MpscReceiver, MpscSender};

/// Number of independent rings.
pub const SHARD_COUNT: usize = 4;

/// Create a sharded queue whose rings sum to at least `total_capacity`
/// slots and split it into its two handles.
pub fn queue<T>(total_capacity: usize) -> (ShardedSender<T>, ShardedReceiver<T>) {
    let per_ring = super::cap_pow2(total_capacity.div_ceil(SHARD_COUNT));
    let mut senders = Vec::with_capacity(SHARD_COUNT);
    let mut receivers = Vec::with_capacity(SHARD_COUNT);
    for _ in 0..SHARD_COUNT {
        let (tx, rx) = mpsc::queue(per_ring);
        senders.push(tx);
        receivers.push(rx);
    }
    (
        ShardedSender {
            rings: senders.into_boxed_slice(),
        },
        ShardedReceiver {
            rings: receivers.into_boxed_slice(),
        },
    )
}

/// A thread-sticky token with clock jitter, spreading senders across rings
/// while keeping one burst mostly on one ring.
fn ring_hint() -> usize {
    static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);
    thread_local! {
        static TOKEN: u64 = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    }
    let token = TOKEN.with(|t| *t);
    let clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    // Shift the clock so the hash changes per burst rather than per call.
    ((token ^ (clock >> 16)) as usize) % SHARD_COUNT
}

/// Cloneable producing handle.
pub struct ShardedSender<T> {
    rings: Box<[MpscSender<T>]>,
}

impl<T> Clone for ShardedSender<T> {
    fn clone(&self) -> Self {
        Self {
            rings: self.rings.to_vec().into_boxed_slice(),
        }
    }
}

impl<T> ShardedSender<T> {
    /// Enqueue one value, retrying across rings from the hashed starting
    /// point. Hands the value back once every ring refused it.
    pub fn push(&self, value: T) -> Result<(), T> {
        let start = ring_hint();
        let mut value = value;
        for attempt in 0..SHARD_COUNT {
            match self.rings[(start + attempt) % SHARD_COUNT].push(value) {
                Ok(()) => return Ok(()),
                Err(back) => value = back,
            }
        }
        Err(value)
    }

    /// Buffered values across all rings (racy snapshot).
    pub fn len(&self) -> usize {
        self.rings.iter().map(MpscSender::len).sum()
    }

    /// Whether every ring's snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(MpscSender::is_empty)
    }

    /// Total capacity across rings.
    pub fn capacity(&self) -> usize {
        self.rings.iter().map(MpscSender::capacity).sum()
    }
}

/// Unique consuming handle.
pub struct ShardedReceiver<T> {
    rings: Box<[MpscReceiver<T>]>,
}

impl<T> ShardedReceiver<T> {
    /// Dequeue the first value found polling rings in index order.
    pub fn pop(&mut self) -> Option<T> {
        self.rings.iter_mut().find_map(MpscReceiver::pop)
    }

    /// Reference the next value the poll order would return.
    pub fn peek(&mut self) -> Option<&T> {
        // find_map borrows each ring mutably for the whole closure; index
        // manually to keep the returned borrow tied to one ring.
        let idx = (0..self.rings.len()).find(|&i| {
            let ring = &mut self.rings[i];
            ring.peek().is_some()
        })?;
        self.rings[idx].peek()
    }

    /// Dequeue up to `max` values into `out`; returns how many moved.
    pub fn pop_batch(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let mut moved = 0;
        for ring in self.rings.iter_mut() {
            if moved >= max {
                break;
            }
            moved += ring.pop_batch(out, max - moved);
        }
        moved
    }

    /// Drop everything buffered in every ring.
    pub fn clear(&mut self) -> usize {
        self.rings.iter_mut().map(MpscReceiver::clear).sum()
    }

    /// Buffered values across all rings (racy snapshot).
    pub fn len(&self) -> usize {
        self.rings.iter().map(MpscReceiver::len).sum()
    }

    /// Whether every ring's snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(MpscReceiver::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_push_pop_all_delivered() {
        let (tx, mut rx) = queue::<u32>(64);
        for i in 0..40 {
            tx.push(i).unwrap();
        }
        let mut seen = HashSet::new();
        while let Some(v) = rx.pop() {
            seen.insert(v);
        }
        // Delivery is complete even though order is not guaranteed.
        assert_eq!(seen.len(), 40);
        assert!(seen.contains(&0) && seen.contains(&39));
    }

    #[test]
    fn test_capacity_is_sharded() {
        let (tx, _rx) = queue::<u8>(64);
        assert_eq!(tx.capacity(), 64);
    }

    #[test]
    fn test_full_after_bounded_retries() {
        let (tx, mut rx) = queue::<u32>(SHARD_COUNT * 2);
        let mut accepted = 0;
        loop {
            match tx.push(accepted) {
                Ok(()) => accepted += 1,
                Err(back) => {
                    assert_eq!(back, accepted);
                    break;
                }
            }
        }
        // Every ring filled before the push failed.
        assert_eq!(accepted as usize, tx.capacity());
        assert!(rx.pop().is_some());
        tx.push(0).unwrap();
    }

    #[test]
    fn test_len_sums_rings() {
        let (tx, mut rx) = queue::<u32>(64);
        for i in 0..10 {
            tx.push(i).unwrap();
        }
        assert_eq!(tx.len(), 10);
        assert_eq!(rx.len(), 10);
        rx.pop();
        assert_eq!(rx.len(), 9);
    }

    #[test]
    fn test_clear() {
        let (tx, mut rx) = queue::<String>(64);
        for i in 0..12 {
            tx.push(i.to_string()).unwrap();
        }
        assert_eq!(rx.clear(), 12);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_concurrent_fan_in() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 10_000;
        let (tx, mut rx) = queue::<usize>(1024);

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let tx = tx.clone();
                std::thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut item = p * PER_PRODUCER + i;
                        loop {
                            match tx.push(item) {
                                Ok(()) => break,
                                Err(back) => {
                                    item = back;
                                    std::hint::spin_loop();
                                }
                            }
                        }
                    }
                })
            })
            .collect();

        let mut seen = HashSet::new();
        while seen.len() < PRODUCERS * PER_PRODUCER {
            if let Some(v) = rx.pop() {
                assert!(seen.insert(v), "duplicate delivery of {v}");
            } else {
                std::hint::spin_loop();
            }
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
