//! Bounded MPMC global queue with strict priority lanes.
//!
//! The scheduler's overflow/injection queue. Any thread may push, any
//! worker may pop. Internally one sequence-stamped MPMC ring per priority
//! level; `pop` scans lanes from `Critical` down to `Low`, so control
//! traffic overtakes bulk work without per-task heap ordering.

// Layer 1: Standard library imports
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::pad::CachePadded;
use crate::message::Priority;

struct Slot<T> {
    seq: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// One bounded MPMC ring (Vyukov-style sequence stamps).
///
/// Stamp states for position `pos`: `seq == pos` free (claimable by a
/// producer), `seq == pos + 1` published (claimable by a consumer),
/// `seq == pos + capacity` consumed (free again next lap).
struct MpmcRing<T> {
    tail: CachePadded<AtomicU64>,
    head: CachePadded<AtomicU64>,
    mask: u64,
    buffer: Box<[Slot<T>]>,
}

// Safety: slot handoff is mediated by the sequence stamps.
unsafe impl<T: Send> Send for MpmcRing<T> {}
unsafe impl<T: Send> Sync for MpmcRing<T> {}

impl<T> MpmcRing<T> {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = super::cap_pow2(capacity);
        let mut buffer = Vec::with_capacity(capacity);
        for seq in 0..capacity as u64 {
            buffer.push(Slot {
                seq: AtomicU64::new(seq),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            });
        }
        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            mask: (capacity - 1) as u64,
            buffer: buffer.into_boxed_slice(),
        }
    }

    fn push(&self, value: T) -> Result<(), T> {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[(tail & self.mask) as usize];
            // Acquire: pairs with the consuming Release restamp.
            let seq = slot.seq.load(Ordering::Acquire);
            if seq == tail {
                match self.tail.compare_exchange_weak(
                    tail,
                    tail + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: CAS granted exclusive slot ownership.
                        unsafe { (*slot.value.get()).write(value) };
                        // Release publishes the value to consumers.
                        slot.seq.store(tail + 1, Ordering::Release);
                        return Ok(());
                    }
                    Err(observed) => tail = observed,
                }
            } else if seq < tail {
                return Err(value);
            } else {
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    fn pop(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[(head & self.mask) as usize];
            // Acquire: pairs with the producing Release publish.
            let seq = slot.seq.load(Ordering::Acquire);
            if seq == head + 1 {
                match self.head.compare_exchange_weak(
                    head,
                    head + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: CAS granted exclusive slot ownership.
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        // Release hands the slot to next-lap producers.
                        slot.seq
                            .store(head + self.buffer.len() as u64, Ordering::Release);
                        return Some(value);
                    }
                    Err(observed) => head = observed,
                }
            } else if seq <= head {
                // Nothing published at head: empty.
                return None;
            } else {
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }

    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.saturating_sub(head) as usize
    }
}

impl<T> Drop for MpmcRing<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

/// The scheduler's bounded global queue, one lane per [`Priority`].
pub struct GlobalQueue<T> {
    lanes: [MpmcRing<T>; Priority::LEVELS],
}

impl<T> GlobalQueue<T> {
    /// Create a queue whose *each lane* holds `capacity_per_lane` slots
    /// (rounded up to a power of two).
    pub fn with_capacity(capacity_per_lane: usize) -> Self {
        Self {
            lanes: [
                MpmcRing::with_capacity(capacity_per_lane),
                MpmcRing::with_capacity(capacity_per_lane),
                MpmcRing::with_capacity(capacity_per_lane),
                MpmcRing::with_capacity(capacity_per_lane),
            ],
        }
    }

    /// Enqueue into the lane for `priority`; hands the value back when
    /// that lane is full.
    pub fn push(&self, value: T, priority: Priority) -> Result<(), T> {
        self.lanes[priority.index()].push(value)
    }

    /// Dequeue the highest-priority available value (Critical first).
    pub fn pop(&self) -> Option<T> {
        // Strict priority: scan lanes top-down every call.
        self.lanes.iter().rev().find_map(MpmcRing::pop)
    }

    /// Buffered values across lanes (racy snapshot).
    pub fn len(&self) -> usize {
        self.lanes.iter().map(MpmcRing::len).sum()
    }

    /// Whether every lane's snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything buffered. Returns how many values were discarded.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        for lane in &self.lanes {
            while lane.pop().is_some() {
                dropped += 1;
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_pop_order() {
        let q = GlobalQueue::with_capacity(8);
        q.push("low", Priority::Low).unwrap();
        q.push("normal", Priority::Normal).unwrap();
        q.push("critical", Priority::Critical).unwrap();
        q.push("high", Priority::High).unwrap();

        assert_eq!(q.pop(), Some("critical"));
        assert_eq!(q.pop(), Some("high"));
        assert_eq!(q.pop(), Some("normal"));
        assert_eq!(q.pop(), Some("low"));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_fifo_within_lane() {
        let q = GlobalQueue::with_capacity(8);
        for i in 0..5 {
            q.push(i, Priority::Normal).unwrap();
        }
        for i in 0..5 {
            assert_eq!(q.pop(), Some(i));
        }
    }

    #[test]
    fn test_lane_full() {
        let q = GlobalQueue::with_capacity(2);
        q.push(1, Priority::Low).unwrap();
        q.push(2, Priority::Low).unwrap();
        assert_eq!(q.push(3, Priority::Low), Err(3));
        // Other lanes unaffected.
        q.push(4, Priority::High).unwrap();
    }

    #[test]
    fn test_clear() {
        let q = GlobalQueue::with_capacity(8);
        for i in 0..6 {
            q.push(i, Priority::Normal).unwrap();
        }
        q.push(6, Priority::Critical).unwrap();
        assert_eq!(q.clear(), 7);
        assert!(q.is_empty());
    }

    #[test]
    fn test_mpmc_concurrent_push_pop() {
        use std::collections::HashSet;
        use std::sync::atomic::{AtomicBool, Ordering as AtomOrd};
        use std::sync::{Arc, Mutex};

        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 25_000;

        let q = Arc::new(GlobalQueue::with_capacity(1024));
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let done = Arc::new(AtomicBool::new(false));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = Arc::clone(&q);
                std::thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut item = p * PER_PRODUCER + i;
                        loop {
                            match q.push(item, Priority::Normal) {
                                Ok(()) => break,
                                Err(back) => {
                                    item = back;
                                    std::thread::yield_now();
                                }
                            }
                        }
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let q = Arc::clone(&q);
                let seen = Arc::clone(&seen);
                let done = Arc::clone(&done);
                std::thread::spawn(move || loop {
                    match q.pop() {
                        Some(v) => {
                            assert!(seen.lock().unwrap().insert(v), "duplicate {v}");
                        }
                        None => {
                            if done.load(AtomOrd::Acquire) && q.is_empty() {
                                break;
                            }
                            std::thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        done.store(true, AtomOrd::Release);
        for c in consumers {
            c.join().unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), PRODUCERS * PER_PRODUCER);
    }
}
