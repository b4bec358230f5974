//! Bounded multi-producer single-consumer queue.
//!
//! Slots are preallocated in one arena and stamped with a sequence number
//! that encodes their state, so producers never touch the consumer's index
//! on the fast path:
//!
//! - slot `seq == pos`: free, a producer may claim position `pos`;
//! - slot `seq == pos + 1`: published, the consumer may read position `pos`;
//! - after consumption the slot is restamped `pos + capacity`, making it
//!   claimable on the next lap.
//!
//! Producers claim a position with a CAS on `tail`; the single consumer
//! advances `head` with a plain store (no CAS on the pop path). FIFO holds
//! per producer; sends from distinct producers interleave in claim order.

// Layer 1: Standard library imports
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::pad::CachePadded;

pub(crate) struct Slot<T> {
    seq: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

pub(crate) struct Inner<T> {
    /// Next position producers will claim. CAS-advanced.
    tail: CachePadded<AtomicU64>,
    /// Next position the consumer will read. Store-advanced, single writer.
    head: CachePadded<AtomicU64>,
    mask: u64,
    buffer: Box<[Slot<T>]>,
}

// Safety: slot ownership is handed between threads through the sequence
// stamps' acquire/release pairs.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Inner<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Arc<Self> {
        let capacity = super::cap_pow2(capacity);
        let mut buffer = Vec::with_capacity(capacity);
        for seq in 0..capacity as u64 {
            buffer.push(Slot {
                seq: AtomicU64::new(seq),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            });
        }
        Arc::new(Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            mask: (capacity - 1) as u64,
            buffer: buffer.into_boxed_slice(),
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.saturating_sub(head) as usize
    }

    /// Producer-side push. Callable from any thread.
    pub(crate) fn push(&self, value: T) -> Result<(), T> {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[(tail & self.mask) as usize];
            // Acquire: pairs with the consumer's Release restamp, so a
            // reclaimed slot's previous contents are fully read before we
            // overwrite them.
            let seq = slot.seq.load(Ordering::Acquire);
            if seq == tail {
                // Relaxed on success: the slot write below is published by
                // the seq Release store, not by the tail CAS.
                match self.tail.compare_exchange_weak(
                    tail,
                    tail + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: the CAS gave this producer exclusive
                        // ownership of the slot for position `tail`.
                        unsafe { (*slot.value.get()).write(value) };
                        // Release publishes the value to the consumer's
                        // Acquire seq load.
                        slot.seq.store(tail + 1, Ordering::Release);
                        return Ok(());
                    }
                    Err(observed) => tail = observed,
                }
            } else if seq < tail {
                // The slot still holds last lap's value: queue is full.
                return Err(value);
            } else {
                // Another producer claimed this position; chase the tail.
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Consumer-side pop. Must only be called by the single consumer; the
    /// public [`MpscReceiver`] enforces that with `&mut self`.
    fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = &self.buffer[(head & self.mask) as usize];
        // Acquire: pairs with the producer's Release publish of the value.
        let seq = slot.seq.load(Ordering::Acquire);
        if seq != head + 1 {
            return None;
        }
        // Safety: seq == head + 1 certifies a published value that only
        // this consumer reads.
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        // Release: hands the emptied slot back to producers lapping around.
        slot.seq.store(head + self.buffer.len() as u64, Ordering::Release);
        self.head.store(head + 1, Ordering::Relaxed);
        Some(value)
    }

    fn peek(&self) -> Option<&T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = &self.buffer[(head & self.mask) as usize];
        let seq = slot.seq.load(Ordering::Acquire);
        if seq != head + 1 {
            return None;
        }
        // Safety: published slot, single consumer.
        Some(unsafe { (*slot.value.get()).assume_init_ref() })
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

/// Create a bounded MPSC queue with at least `capacity` slots (rounded up
/// to a power of two).
pub fn queue<T>(capacity: usize) -> (MpscSender<T>, MpscReceiver<T>) {
    let inner = Inner::with_capacity(capacity);
    (
        MpscSender {
            inner: Arc::clone(&inner),
        },
        MpscReceiver {
            inner,
            _not_sync: PhantomData,
        },
    )
}

/// Cloneable producing handle.
pub struct MpscSender<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for MpscSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> MpscSender<T> {
    /// Enqueue one value; on a full queue the value is handed back.
    pub fn push(&self, value: T) -> Result<(), T> {
        self.inner.push(value)
    }

    /// Enqueue values from the front of `items` until the queue fills.
    /// Returns how many were taken; leftovers stay in `items` in order.
    /// Slot claims remain per-value so interleaving with other producers
    /// matches repeated `push`.
    pub fn push_batch(&self, items: &mut Vec<T>) -> usize {
        let mut taken = 0;
        let mut iter = std::mem::take(items).into_iter();
        for value in iter.by_ref() {
            match self.inner.push(value) {
                Ok(()) => taken += 1,
                Err(back) => {
                    items.push(back);
                    break;
                }
            }
        }
        items.extend(iter);
        taken
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Number of buffered values (racy snapshot).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unique consuming handle.
pub struct MpscReceiver<T> {
    inner: Arc<Inner<T>>,
    /// The pop path stores `head` without a CAS, which is only sound with
    /// one consumer; keeping the receiver `!Sync` makes that structural.
    _not_sync: PhantomData<std::cell::Cell<()>>,
}

impl<T> MpscReceiver<T> {
    /// Dequeue one value, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop()
    }

    /// Reference the next value without consuming it.
    pub fn peek(&mut self) -> Option<&T> {
        self.inner.peek()
    }

    /// Dequeue up to `max` values into `out`; returns how many moved.
    pub fn pop_batch(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let mut moved = 0;
        while moved < max {
            match self.inner.pop() {
                Some(value) => {
                    out.push(value);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    /// Drop every buffered value. Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.inner.pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Number of buffered values (racy snapshot).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

// Safety: the receiver moves between threads freely; only concurrent use
// from two threads is excluded (via !Sync).
unsafe impl<T: Send> Send for MpscReceiver<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let (tx, mut rx) = queue::<u32>(8);
        tx.push(1).unwrap();
        tx.push(2).unwrap();
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(rx.pop(), Some(2));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_full() {
        let (tx, mut rx) = queue::<u32>(4);
        for i in 0..4 {
            tx.push(i).unwrap();
        }
        assert_eq!(tx.push(9), Err(9));
        assert_eq!(rx.pop(), Some(0));
        tx.push(9).unwrap();
    }

    #[test]
    fn test_peek() {
        let (tx, mut rx) = queue::<u32>(4);
        assert_eq!(rx.peek(), None);
        tx.push(5).unwrap();
        assert_eq!(rx.peek(), Some(&5));
        assert_eq!(rx.pop(), Some(5));
    }

    #[test]
    fn test_batch_push_leftovers() {
        let (tx, mut rx) = queue::<u32>(4);
        let mut items: Vec<u32> = (0..6).collect();
        assert_eq!(tx.push_batch(&mut items), 4);
        assert_eq!(items, vec![4, 5]);
        let mut out = Vec::new();
        assert_eq!(rx.pop_batch(&mut out, 10), 4);
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_clear() {
        let (tx, mut rx) = queue::<String>(8);
        for i in 0..5 {
            tx.push(i.to_string()).unwrap();
        }
        assert_eq!(rx.clear(), 5);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_fifo_per_producer() {
        const PRODUCERS: u64 = 4;
        const PER_PRODUCER: u64 = 50_000;
        let (tx, mut rx) = queue::<(u64, u64)>(1024);

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let tx = tx.clone();
                std::thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut item = (p, i);
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

        let mut last_seen = vec![None::<u64>; PRODUCERS as usize];
        let mut received = 0;
        while received < PRODUCERS * PER_PRODUCER {
            if let Some((p, i)) = rx.pop() {
                // Per-producer FIFO: each producer's values arrive in order.
                if let Some(last) = last_seen[p as usize] {
                    assert!(i > last, "producer {p} reordered: {i} after {last}");
                }
                last_seen[p as usize] = Some(i);
                received += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_drop_releases_remaining() {
        let tracker = std::sync::Arc::new(());
        let (tx, rx) = queue::<std::sync::Arc<()>>(8);
        for _ in 0..5 {
            tx.push(std::sync::Arc::clone(&tracker)).unwrap();
        }
        assert_eq!(std::sync::Arc::strong_count(&tracker), 6);
        drop(tx);
        drop(rx);
        assert_eq!(std::sync::Arc::strong_count(&tracker), 1);
    }
}
