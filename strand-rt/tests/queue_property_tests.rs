//! Property tests for the lock-free queues.

use proptest::collection::vec;
use proptest::prelude::*;

use strand_rt::queue::{deque, mpsc, sharded, spsc, Steal};

proptest! {
    /// Whatever goes into the SPSC ring comes out in order, across any
    /// interleaving of pushes and pops.
    #[test]
    fn spsc_preserves_fifo(ops in vec(any::<bool>(), 1..512), values in vec(any::<u32>(), 512)) {
        let (mut tx, mut rx) = spsc::ring::<u32>(64);
        let mut next_in = 0usize;
        let mut next_out = 0usize;

        for push in ops {
            if push {
                if next_in < values.len() && tx.push(values[next_in]).is_ok() {
                    next_in += 1;
                }
            } else if let Some(got) = rx.pop() {
                prop_assert_eq!(got, values[next_out]);
                next_out += 1;
            }
        }
        while let Some(got) = rx.pop() {
            prop_assert_eq!(got, values[next_out]);
            next_out += 1;
        }
        prop_assert_eq!(next_out, next_in);
    }

    /// The ring never holds more than its capacity and `len` matches the
    /// push/pop balance.
    #[test]
    fn spsc_capacity_bound(capacity in 1usize..128, pushes in 1usize..512) {
        let (mut tx, mut rx) = spsc::ring::<usize>(capacity);
        let real_capacity = tx.capacity();
        let mut accepted = 0usize;

        for n in 0..pushes {
            if tx.push(n).is_ok() {
                accepted += 1;
            }
            prop_assert!(rx.len() <= real_capacity);
        }
        prop_assert_eq!(accepted, pushes.min(real_capacity));
        prop_assert_eq!(rx.clear(), accepted);
    }

    /// Batch transfers are equivalent to repeated single-message calls.
    #[test]
    fn spsc_batch_equivalence(values in vec(any::<u16>(), 1..256)) {
        let (mut tx, mut rx) = spsc::ring::<u16>(values.len());
        let mut pending = values.clone();
        let pushed = tx.push_batch(&mut pending);
        prop_assert_eq!(pushed + pending.len(), values.len());

        let mut out = Vec::new();
        rx.pop_batch(&mut out, values.len());
        prop_assert_eq!(&out[..], &values[..pushed]);
    }

    /// MPSC keeps every accepted element exactly once (single-threaded
    /// interleavings; the threaded cases live in the unit tests).
    #[test]
    fn mpsc_no_loss_no_duplication(ops in vec(any::<bool>(), 1..512)) {
        let (tx, mut rx) = mpsc::queue::<usize>(32);
        let mut accepted = 0usize;
        let mut popped = Vec::new();

        for (i, push) in ops.into_iter().enumerate() {
            if push {
                if tx.push(i).is_ok() {
                    accepted += 1;
                }
            } else if let Some(v) = rx.pop() {
                popped.push(v);
            }
        }
        while let Some(v) = rx.pop() {
            popped.push(v);
        }

        prop_assert_eq!(popped.len(), accepted);
        let mut sorted = popped.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), accepted);
        // Single producer: order also holds.
        prop_assert!(popped.windows(2).all(|w| w[0] < w[1]));
    }

    /// The sharded queue delivers everything it accepts, exactly once.
    #[test]
    fn sharded_delivers_exactly_once(count in 1usize..256) {
        let (tx, mut rx) = sharded::queue::<usize>(512);
        let mut accepted = Vec::new();
        for n in 0..count {
            if tx.push(n).is_ok() {
                accepted.push(n);
            }
        }
        let mut got = Vec::new();
        while let Some(v) = rx.pop() {
            got.push(v);
        }
        got.sort_unstable();
        prop_assert_eq!(got, accepted);
    }

    /// Owner pop is LIFO, thief steal is FIFO, and the two never observe
    /// the same element.
    #[test]
    fn deque_owner_and_thief_partition(ops in vec(0u8..3, 1..512)) {
        let (mut worker, stealer) = deque::deque::<usize>(64);
        let mut next = 0usize;
        let mut taken = Vec::new();

        for op in ops {
            match op {
                0 => {
                    if worker.push(next).is_ok() {
                        next += 1;
                    }
                }
                1 => {
                    if let Some(v) = worker.pop() {
                        taken.push(v);
                    }
                }
                _ => {
                    if let Steal::Success(v) = stealer.steal() {
                        taken.push(v);
                    }
                }
            }
        }
        while let Some(v) = worker.pop() {
            taken.push(v);
        }

        prop_assert_eq!(taken.len(), next);
        taken.sort_unstable();
        taken.dedup();
        prop_assert_eq!(taken.len(), next);
    }
}
