//! Single-producer single-consumer ring buffer.
//!
//! # Synchronization protocol
//!
//! Positions are unbounded `u64` sequence numbers; the buffer index is
//! `seq & mask`. `tail` is written only by the producer, `head` only by the
//! consumer. Each handle keeps a cached copy of the *other* side's index so
//! the common case touches no foreign cache line at all:
//!
//! - **Producer**: load `tail` (Relaxed: own field), check against the
//!   cached head; on apparent fullness refresh the cache with an Acquire
//!   load of `head` (pairs with the consumer's Release store, making the
//!   consumed slot reusable). Write the slot, then store `tail` with
//!   Release to publish the write.
//! - **Consumer**: load `head` (Relaxed: own field), check against the
//!   cached tail; on apparent emptiness refresh with an Acquire load of
//!   `tail` (pairs with the producer's Release store, making the slot
//!   contents visible). Read the slot, then store `head` with Release to
//!   return the slot to the producer.
//!
//! Batch transfers compute available space once and publish a single index
//! update, amortizing the two fence pairs over the whole batch.
//!
//! The handle split enforces the shape at compile time: [`SpscProducer`]
//! and [`SpscConsumer`] are not cloneable, and their mutating operations
//! take `&mut self`.

// Layer 1: Standard library imports
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::pad::CachePadded;

struct Inner<T> {
    /// Next sequence the producer will write. Producer-owned.
    tail: CachePadded<AtomicU64>,
    /// Next sequence the consumer will read. Consumer-owned.
    head: CachePadded<AtomicU64>,
    mask: u64,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: slots between head and tail are owned by exactly one side at a
// time; the acquire/release protocol above transfers that ownership.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Both handles are gone; any remaining elements are dropped here,
        // exactly once.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        for seq in head..tail {
            let slot = self.buffer[(seq & self.mask) as usize].get();
            // Safety: [head, tail) slots hold initialized values.
            unsafe { (*slot).assume_init_drop() };
        }
    }
}

/// Create a ring with at least `capacity` slots (rounded up to a power of
/// two) and split it into its two handles.
pub fn ring<T>(capacity: usize) -> (SpscProducer<T>, SpscConsumer<T>) {
    let capacity = super::cap_pow2(capacity);
    let mut buffer = Vec::with_capacity(capacity);
    buffer.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));

    let inner = Arc::new(Inner {
        tail: CachePadded::new(AtomicU64::new(0)),
        head: CachePadded::new(AtomicU64::new(0)),
        mask: (capacity - 1) as u64,
        buffer: buffer.into_boxed_slice(),
    });

    (
        SpscProducer {
            inner: Arc::clone(&inner),
            cached_head: 0,
        },
        SpscConsumer {
            inner,
            cached_tail: 0,
        },
    )
}

/// The producing half of a [`ring`].
pub struct SpscProducer<T> {
    inner: Arc<Inner<T>>,
    cached_head: u64,
}

impl<T> SpscProducer<T> {
    /// Ring capacity.
    pub fn capacity(&self) -> usize {
        self.inner.buffer.len()
    }

    /// Enqueue one value; on a full ring the value is handed back.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        if self.free_slots(tail) == 0 {
            return Err(value);
        }
        let slot = self.inner.buffer[(tail & self.inner.mask) as usize].get();
        // Safety: the slot at `tail` is free (head cache proved it) and
        // only the producer writes unpublished slots.
        unsafe { (*slot).write(value) };
        self.inner.tail.store(tail + 1, Ordering::Release);
        Ok(())
    }

    /// Enqueue up to `items.len()` values in one space computation and a
    /// single index publication. Returns how many were taken (from the
    /// front, preserving order); the rest stay in `items`.
    pub fn push_batch(&mut self, items: &mut Vec<T>) -> usize {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let n = self.free_slots(tail).min(items.len());
        if n == 0 {
            return 0;
        }
        for (offset, value) in items.drain(..n).enumerate() {
            let seq = tail + offset as u64;
            let slot = self.inner.buffer[(seq & self.inner.mask) as usize].get();
            // Safety: all n slots were free at the single space check.
            unsafe { (*slot).write(value) };
        }
        self.inner.tail.store(tail + n as u64, Ordering::Release);
        n
    }

    /// Number of buffered values (racy snapshot).
    pub fn len(&self) -> usize {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let head = self.inner.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn free_slots(&mut self, tail: u64) -> usize {
        let capacity = self.inner.buffer.len() as u64;
        if tail - self.cached_head >= capacity {
            // Acquire: pairs with the consumer's Release head store, so the
            // freed slots are genuinely ours to overwrite.
            self.cached_head = self.inner.head.load(Ordering::Acquire);
        }
        (capacity - (tail - self.cached_head)) as usize
    }
}

/// The consuming half of a [`ring`].
pub struct SpscConsumer<T> {
    inner: Arc<Inner<T>>,
    cached_tail: u64,
}

impl<T> SpscConsumer<T> {
    /// Dequeue one value, or `None` when the ring is empty.
    pub fn pop(&mut self) -> Option<T> {
        let head = self.inner.head.load(Ordering::Relaxed);
        if self.available(head) == 0 {
            return None;
        }
        let slot = self.inner.buffer[(head & self.inner.mask) as usize].get();
        // Safety: tail cache proved the slot is published; only the
        // consumer reads published slots.
        let value = unsafe { (*slot).assume_init_read() };
        self.inner.head.store(head + 1, Ordering::Release);
        Some(value)
    }

    /// Reference the next value without consuming it.
    pub fn peek(&mut self) -> Option<&T> {
        let head = self.inner.head.load(Ordering::Relaxed);
        if self.available(head) == 0 {
            return None;
        }
        let slot = self.inner.buffer[(head & self.inner.mask) as usize].get();
        // Safety: published slot; the borrow on self blocks pop until the
        // reference is released.
        Some(unsafe { (*slot).assume_init_ref() })
    }

    /// Dequeue up to `max` values into `out` with a single index
    /// publication. Returns how many were moved.
    pub fn pop_batch(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let head = self.inner.head.load(Ordering::Relaxed);
        let n = self.available(head).min(max);
        if n == 0 {
            return 0;
        }
        out.reserve(n);
        for offset in 0..n as u64 {
            let slot = self.inner.buffer[((head + offset) & self.inner.mask) as usize].get();
            // Safety: all n slots were published at the single check.
            out.push(unsafe { (*slot).assume_init_read() });
        }
        self.inner.head.store(head + n as u64, Ordering::Release);
        n
    }

    /// Drop every buffered value. Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Number of buffered values (racy snapshot).
    pub fn len(&self) -> usize {
        let tail = self.inner.tail.load(Ordering::Relaxed);
        let head = self.inner.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn available(&mut self, head: u64) -> usize {
        if head == self.cached_tail {
            // Acquire: pairs with the producer's Release tail store; the
            // slot contents are visible once the new tail is.
            self.cached_tail = self.inner.tail.load(Ordering::Acquire);
        }
        (self.cached_tail - head) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_fifo() {
        let (mut tx, mut rx) = ring::<u32>(8);
        for i in 0..5 {
            tx.push(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(rx.pop(), Some(i));
        }
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_capacity_rounds_to_pow2() {
        let (tx, _rx) = ring::<u8>(5);
        assert_eq!(tx.capacity(), 8);
    }

    #[test]
    fn test_full_returns_value() {
        let (mut tx, mut rx) = ring::<u32>(4);
        for i in 0..4 {
            tx.push(i).unwrap();
        }
        assert_eq!(tx.push(99), Err(99));
        assert_eq!(rx.pop(), Some(0));
        tx.push(99).unwrap();
    }

    #[test]
    fn test_wraparound() {
        let (mut tx, mut rx) = ring::<u64>(4);
        for round in 0..100u64 {
            tx.push(round).unwrap();
            assert_eq!(rx.pop(), Some(round));
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let (mut tx, mut rx) = ring::<u32>(4);
        tx.push(7).unwrap();
        assert_eq!(rx.peek(), Some(&7));
        assert_eq!(rx.peek(), Some(&7));
        assert_eq!(rx.pop(), Some(7));
        assert_eq!(rx.peek(), None);
    }

    #[test]
    fn test_batch_transfer() {
        let (mut tx, mut rx) = ring::<u32>(8);
        let mut items: Vec<u32> = (0..12).collect();
        assert_eq!(tx.push_batch(&mut items), 8);
        assert_eq!(items, vec![8, 9, 10, 11]);

        let mut out = Vec::new();
        assert_eq!(rx.pop_batch(&mut out, 5), 5);
        assert_eq!(out, vec![0, 1, 2, 3, 4]);

        assert_eq!(tx.push_batch(&mut items), 4);
        assert!(items.is_empty());

        out.clear();
        assert_eq!(rx.pop_batch(&mut out, 64), 7);
        assert_eq!(out, vec![5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_clear_drops_all() {
        let (mut tx, mut rx) = ring::<String>(8);
        for i in 0..6 {
            tx.push(format!("m{i}")).unwrap();
        }
        assert_eq!(rx.clear(), 6);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_drop_releases_remaining() {
        let (mut tx, rx) = ring::<std::sync::Arc<()>>(8);
        let tracker = std::sync::Arc::new(());
        for _ in 0..4 {
            tx.push(std::sync::Arc::clone(&tracker)).unwrap();
        }
        assert_eq!(std::sync::Arc::strong_count(&tracker), 5);
        drop(tx);
        drop(rx);
        assert_eq!(std::sync::Arc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_cross_thread_fifo() {
        const N: u64 = 100_000;
        let (mut tx, mut rx) = ring::<u64>(1024);

        let producer = std::thread::spawn(move || {
            let mut next = 0;
            while next < N {
                if tx.push(next).is_ok() {
                    next += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        });

        let mut expected = 0;
        while expected < N {
            if let Some(value) = rx.pop() {
                assert_eq!(value, expected);
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        producer.join().unwrap();
    }
}
