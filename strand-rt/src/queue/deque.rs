//! Chase–Lev work-stealing deque.
//!
//! The owning worker pushes and pops at the *bottom*; thieves steal from
//! the *top* with a CAS. The implementation follows the corrected
//! weak-memory protocol of Lê, Pop, Cocchini ("Correct and Efficient
//! Work-Stealing for Weak Memory Models"): the owner's pop publishes its
//! reserved bottom with a `SeqCst` fence before examining top, and every
//! top CAS is `SeqCst`, so an owner and a thief can never both take the
//! last element.
//!
//! Capacity is fixed (power of two). `push` hands the task back when the
//! deque is full so the caller can overflow into the global queue instead
//! of growing the buffer.

// Layer 1: Standard library imports
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{fence, AtomicI64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::pad::CachePadded;

/// Outcome of a steal attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Steal<T> {
    /// The deque was observed empty.
    Empty,
    /// Lost a race; the caller may try again.
    Retry,
    /// Took one task from the top.
    Success(T),
}

struct Inner<T> {
    /// Thief end. Advanced only by successful `SeqCst` CAS.
    top: CachePadded<AtomicI64>,
    /// Owner end. Written only by the owner.
    bottom: CachePadded<AtomicI64>,
    mask: i64,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: the Chase–Lev protocol transfers slot ownership through the
// top CAS / bottom publication; see the module docs.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let top = self.top.load(Ordering::Relaxed);
        let bottom = self.bottom.load(Ordering::Relaxed);
        for seq in top..bottom {
            let slot = self.buffer[(seq & self.mask) as usize].get();
            // Safety: [top, bottom) slots hold initialized values and no
            // handle remains to race with.
            unsafe { (*slot).assume_init_drop() };
        }
    }
}

/// Create a deque with at least `capacity` slots (rounded up to a power of
/// two) and split it into the owner and thief handles.
pub fn deque<T>(capacity: usize) -> (DequeWorker<T>, DequeStealer<T>) {
    let capacity = super::cap_pow2(capacity);
    let mut buffer = Vec::with_capacity(capacity);
    buffer.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));

    let inner = Arc::new(Inner {
        top: CachePadded::new(AtomicI64::new(0)),
        bottom: CachePadded::new(AtomicI64::new(0)),
        mask: (capacity - 1) as i64,
        buffer: buffer.into_boxed_slice(),
    });

    (
        DequeWorker {
            inner: Arc::clone(&inner),
        },
        DequeStealer { inner },
    )
}

/// Owner handle: LIFO push/pop at the bottom. Not cloneable.
pub struct DequeWorker<T> {
    inner: Arc<Inner<T>>,
}

impl<T> DequeWorker<T> {
    /// Push a task at the bottom; hands it back when the deque is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        let b = self.inner.bottom.load(Ordering::Relaxed);
        // Acquire: a stale top can only under-report free space, but the
        // pairing with steal's CAS keeps reused slots' reads complete.
        let t = self.inner.top.load(Ordering::Acquire);
        if b - t >= self.inner.buffer.len() as i64 {
            return Err(value);
        }
        let slot = self.inner.buffer[(b & self.inner.mask) as usize].get();
        // Safety: slot b is outside [top, bottom), owned by the worker.
        unsafe { (*slot).write(value) };
        // Release publishes the slot write to thieves' Acquire bottom load.
        self.inner.bottom.store(b + 1, Ordering::Release);
        Ok(())
    }

    /// Pop the most recently pushed task (LIFO, cache-warm end).
    pub fn pop(&mut self) -> Option<T> {
        let b = self.inner.bottom.load(Ordering::Relaxed) - 1;
        // Reserve the bottom slot before reading top; the SeqCst fence
        // orders this store against the top load below, which is what
        // keeps a concurrent thief from also taking the last element.
        self.inner.bottom.store(b, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        let t = self.inner.top.load(Ordering::Relaxed);

        if t < b {
            // More than one task; the reservation alone is enough.
            let slot = self.inner.buffer[(b & self.inner.mask) as usize].get();
            // Safety: slot b is reserved and thieves cannot pass top == b.
            return Some(unsafe { (*slot).assume_init_read() });
        }

        if t == b {
            // Last task: race thieves for it via the top CAS.
            let won = self
                .inner
                .top
                .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok();
            self.inner.bottom.store(b + 1, Ordering::Relaxed);
            if won {
                let slot = self.inner.buffer[(b & self.inner.mask) as usize].get();
                // Safety: the CAS win grants exclusive ownership of slot b.
                return Some(unsafe { (*slot).assume_init_read() });
            }
            return None;
        }

        // Deque was empty; undo the reservation.
        self.inner.bottom.store(b + 1, Ordering::Relaxed);
        None
    }

    /// Buffered tasks (racy snapshot).
    pub fn len(&self) -> usize {
        let b = self.inner.bottom.load(Ordering::Relaxed);
        let t = self.inner.top.load(Ordering::Relaxed);
        (b - t).max(0) as usize
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deque capacity.
    pub fn capacity(&self) -> usize {
        self.inner.buffer.len()
    }
}

/// Thief handle: FIFO steal at the top. Cloneable across workers.
pub struct DequeStealer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DequeStealer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> DequeStealer<T> {
    /// Try to take the oldest task.
    pub fn steal(&self) -> Steal<T> {
        // Acquire top first, then fence, then Acquire bottom: the fence
        // orders the two loads so a non-empty observation is genuine.
        let t = self.inner.top.load(Ordering::Acquire);
        fence(Ordering::SeqCst);
        let b = self.inner.bottom.load(Ordering::Acquire);
        if t >= b {
            return Steal::Empty;
        }
        let slot = self.inner.buffer[(t & self.inner.mask) as usize].get();
        // Speculatively copy the slot; ownership is only ours if the CAS
        // below wins. The loser must forget its copy, not drop it.
        let value = unsafe { std::ptr::read((*slot).as_ptr()) };
        if self
            .inner
            .top
            .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            std::mem::forget(value);
            return Steal::Retry;
        }
        Steal::Success(value)
    }

    /// Buffered tasks (racy snapshot).
    pub fn len(&self) -> usize {
        let b = self.inner.bottom.load(Ordering::Relaxed);
        let t = self.inner.top.load(Ordering::Relaxed);
        (b - t).max(0) as usize
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
