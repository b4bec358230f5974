//! Worker threads: the pop → global → steal → idle loop.

// Layer 1: Standard library imports
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

// Layer 3: Internal module imports
use super::task::Task;
use super::{SchedulerShared, SchedulerState};
use crate::queue::{DequeWorker, Steal};

/// Per-worker counters, written by the owning worker only.
#[derive(Debug, Default)]
pub struct WorkerCounters {
    executed: AtomicU64,
    stolen: AtomicU64,
    steal_failures: AtomicU64,
}

impl WorkerCounters {
    fn bump(&self, counter: &AtomicU64) {
        // Relaxed: diagnostics only, no ordering requirements.
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot.
    pub fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            executed: self.executed.load(Ordering::Relaxed),
            stolen: self.stolen.load(Ordering::Relaxed),
            steal_failures: self.steal_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of one worker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerStats {
    /// Tasks this worker executed.
    pub executed: u64,
    /// Tasks taken from other workers' deques.
    pub stolen: u64,
    /// Steal attempts that found nothing (or lost the race).
    pub steal_failures: u64,
}

/// Thread-local identity of the current worker, used to route
/// worker-originated submissions to the local deque bottom.
pub(super) struct WorkerHandle {
    pub(super) scheduler: Weak<SchedulerShared>,
    pub(super) index: usize,
    pub(super) deque: RefCell<DequeWorker<Task>>,
}

thread_local! {
    static CURRENT: RefCell<Option<Rc<WorkerHandle>>> = const { RefCell::new(None) };
}

/// Run `f` with the current thread's worker handle, if this thread is a
/// worker of `shared`'s scheduler.
pub(super) fn with_local<R>(
    shared: &Arc<SchedulerShared>,
    f: impl FnOnce(&WorkerHandle) -> R,
) -> Option<R> {
    CURRENT.with(|current| {
        let borrow = current.borrow();
        let handle = borrow.as_ref()?;
        // A worker of a different scheduler instance must not receive this
        // scheduler's tasks into its deque.
        if !Weak::ptr_eq(&handle.scheduler, &Arc::downgrade(shared)) {
            return None;
        }
        Some(f(handle))
    })
}

/// Worker thread entry point.
pub(super) fn worker_main(shared: Arc<SchedulerShared>, index: usize, deque: DequeWorker<Task>) {
    let handle = Rc::new(WorkerHandle {
        scheduler: Arc::downgrade(&shared),
        index,
        deque: RefCell::new(deque),
    });
    CURRENT.with(|current| *current.borrow_mut() = Some(Rc::clone(&handle)));

    run(&shared, &handle);

    CURRENT.with(|current| *current.borrow_mut() = None);
    trace!(worker = index, "worker exited");
}

fn run(shared: &Arc<SchedulerShared>, handle: &WorkerHandle) {
    let mut rng = SmallRng::seed_from_u64(0x9E37_79B9 ^ (handle.index as u64) << 17);
    let mut idle = shared.idle_ladder();
    let counters = &shared.worker_counters[handle.index];

    loop {
        match shared.state() {
            // Starting: the pool is still spawning siblings; queues are
            // already live, so just run.
            SchedulerState::Starting | SchedulerState::Running => {}
            SchedulerState::Stopping | SchedulerState::Stopped => break,
        }

        let task = handle
            .deque
            .borrow_mut()
            .pop()
            .or_else(|| shared.global.pop())
            .or_else(|| steal(shared, handle.index, &mut rng, counters));

        match task {
            Some(task) => {
                task.run();
                counters.bump(&counters.executed);
                idle.reset();
            }
            None => idle.wait(),
        }
    }
}

/// Try to take work from a uniformly random victim, up to the configured
/// number of attempts.
fn steal(
    shared: &Arc<SchedulerShared>,
    self_index: usize,
    rng: &mut SmallRng,
    counters: &WorkerCounters,
) -> Option<Task> {
    if !shared.config.enable_work_stealing || shared.stealers.len() < 2 {
        return None;
    }
    for _ in 0..shared.config.max_steal_attempts {
        let victim = rng.gen_range(0..shared.stealers.len());
        if victim == self_index {
            continue;
        }
        match shared.stealers[victim].steal() {
            Steal::Success(task) => {
                counters.bump(&counters.stolen);
                return Some(task);
            }
            Steal::Retry | Steal::Empty => {
                counters.bump(&counters.steal_failures);
            }
        }
    }
    None
}
