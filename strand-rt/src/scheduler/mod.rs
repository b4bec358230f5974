//! Work-stealing scheduler.
//!
//! A fixed pool of OS worker threads, each owning a Chase–Lev deque, plus
//! a bounded priority-laned global queue for overflow and submissions from
//! non-worker threads. Workers run the loop: pop own deque → pop global →
//! steal from a random victim → idle ladder.
//!
//! Lifecycle: `Stopped → Starting → Running → Stopping → Stopped`. Stop is
//! cooperative (workers observe the state between tasks) and bounded by
//! the shutdown timeout; tasks still queued at shutdown are dropped.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::queue::{deque, DequeStealer, DequeWorker, GlobalQueue, Steal};

mod idle;
mod task;
mod worker;

pub use idle::IdleLadder;
pub use task::{Runnable, Task};
pub use worker::WorkerStats;

use worker::WorkerCounters;

/// Scheduler lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// No workers running.
    Stopped = 0,
    /// Worker threads are being spawned.
    Starting = 1,
    /// Accepting and executing tasks.
    Running = 2,
    /// Workers are draining out of their loops.
    Stopping = 3,
}

impl SchedulerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Scheduler failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The global queue lane for the task's priority is at capacity.
    #[error("scheduler global queue full")]
    QueueFull,

    /// The operation is not legal in the current lifecycle state.
    #[error("scheduler is {actual:?}, operation requires {required:?}")]
    InvalidState {
        /// State the operation needs.
        required: SchedulerState,
        /// State the scheduler was in.
        actual: SchedulerState,
    },

    /// Worker threads failed to spawn.
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(String),

    /// Not every worker joined within the shutdown timeout.
    #[error("{stragglers} worker(s) still running after {timeout:?}")]
    JoinTimeout {
        /// Workers that had not exited at the deadline.
        stragglers: usize,
        /// The deadline that was applied.
        timeout: Duration,
    },
}

/// Tuning knobs the scheduler needs, distilled from the system config.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker threads; 0 detects the CPU count.
    pub worker_threads: usize,
    /// Capacity of each worker's local deque.
    pub worker_queue_capacity: usize,
    /// Capacity of each global-queue priority lane.
    pub global_queue_capacity: usize,
    /// Steal attempts per idle pass.
    pub max_steal_attempts: usize,
    /// Deep-idle sleep duration.
    pub idle_sleep: Duration,
    /// Whether the steal phase runs at all.
    pub enable_work_stealing: bool,
    /// Deadline for `stop` to join workers.
    pub shutdown_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            worker_queue_capacity: 4096,
            global_queue_capacity: 32_768,
            max_steal_attempts: 3,
            idle_sleep: Duration::from_millis(1),
            enable_work_stealing: true,
            shutdown_timeout: Duration::from_millis(5000),
        }
    }
}

pub(crate) struct SchedulerShared {
    state: AtomicU8,
    pub(crate) global: GlobalQueue<Task>,
    pub(crate) stealers: Vec<DequeStealer<Task>>,
    pub(crate) worker_counters: Vec<WorkerCounters>,
    pub(crate) config: SchedulerConfig,
    /// Deques waiting to be moved into their worker threads by `start`.
    pending_deques: Mutex<Vec<Option<DequeWorker<Task>>>>,
}

impl SchedulerShared {
    pub(crate) fn state(&self) -> SchedulerState {
        // Acquire pairs with the Release stores in the lifecycle CASes so
        // a worker observing Running also observes the started pool.
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn idle_ladder(&self) -> IdleLadder {
        IdleLadder::new(self.config.idle_sleep)
    }

    fn transition(&self, from: SchedulerState, to: SchedulerState) -> Result<(), SchedulerError> {
        self.state
            .compare_exchange(
                from as u8,
                to as u8,
                // AcqRel: publishes the work done before the transition and
                // orders it against observers of the new state.
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|actual| SchedulerError::InvalidState {
                required: from,
                actual: SchedulerState::from_u8(actual),
            })
    }
}

/// The worker pool.
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Build a stopped scheduler. Worker count 0 resolves to the detected
    /// CPU count.
    pub fn new(mut config: SchedulerConfig) -> Self {
        if config.worker_threads == 0 {
            config.worker_threads = num_cpus::get().max(1);
        }

        let mut pending = Vec::with_capacity(config.worker_threads);
        let mut stealers = Vec::with_capacity(config.worker_threads);
        let mut counters = Vec::with_capacity(config.worker_threads);
        for _ in 0..config.worker_threads {
            let (worker, stealer) = deque::deque(config.worker_queue_capacity);
            pending.push(Some(worker));
            stealers.push(stealer);
            counters.push(WorkerCounters::default());
        }

        let shared = Arc::new(SchedulerShared {
            state: AtomicU8::new(SchedulerState::Stopped as u8),
            global: GlobalQueue::with_capacity(config.global_queue_capacity),
            stealers,
            worker_counters: counters,
            config,
            pending_deques: Mutex::new(pending),
        });

        Self {
            shared,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// Number of worker threads (resolved).
    pub fn worker_count(&self) -> usize {
        self.shared.config.worker_threads
    }

    /// Spawn the worker threads. Legal only from `Stopped`.
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.shared
            .transition(SchedulerState::Stopped, SchedulerState::Starting)?;

        let mut handles = self.handles.lock();
        let mut pending = self.shared.pending_deques.lock();
        for (index, slot) in pending.iter_mut().enumerate() {
            let Some(deque) = slot.take() else { continue };
            let shared = Arc::clone(&self.shared);
            let handle = std::thread::Builder::new()
                .name(format!("strand-worker-{index}"))
                .spawn(move || worker::worker_main(shared, index, deque))
                .map_err(|e| {
                    // Roll back so a later start can retry cleanly.
                    let _ = self
                        .shared
                        .transition(SchedulerState::Starting, SchedulerState::Stopped);
                    SchedulerError::SpawnFailed(e.to_string())
                })?;
            handles.push(handle);
        }
        drop(pending);

        self.shared
            .transition(SchedulerState::Starting, SchedulerState::Running)?;
        debug!(workers = self.worker_count(), "scheduler running");
        Ok(())
    }

    /// Submit a task.
    ///
    /// From a worker thread of this scheduler the task lands at the bottom
    /// of that worker's deque (cache locality); a full deque, or any other
    /// thread, goes through the global queue lane for the task's priority.
    pub fn submit(&self, task: Task) -> Result<(), SchedulerError> {
        match self.shared.state() {
            SchedulerState::Starting | SchedulerState::Running => {}
            actual => {
                return Err(SchedulerError::InvalidState {
                    required: SchedulerState::Running,
                    actual,
                })
            }
        }

        let overflow = worker::with_local(&self.shared, |local| {
            local.deque.borrow_mut().push(task.clone()).err()
        });
        let task = match overflow {
            Some(None) => return Ok(()),
            Some(Some(task)) => task,
            None => task,
        };

        let priority = task.priority();
        self.shared
            .global
            .push(task, priority)
            .map_err(|_| SchedulerError::QueueFull)
    }

    /// Stop the pool: workers exit after their current task, queued tasks
    /// are dropped. Bounded by the configured shutdown timeout; stragglers
    /// past the deadline are detached and reported.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        match self.shared.state() {
            SchedulerState::Stopped => return Ok(()),
            SchedulerState::Running => {
                self.shared
                    .transition(SchedulerState::Running, SchedulerState::Stopping)?;
            }
            actual => {
                return Err(SchedulerError::InvalidState {
                    required: SchedulerState::Running,
                    actual,
                })
            }
        }

        let deadline = Instant::now() + self.shared.config.shutdown_timeout;
        let mut stragglers = 0;
        for handle in self.handles.lock().drain(..) {
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    break;
                }
                if Instant::now() >= deadline {
                    stragglers += 1;
                    break;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }

        // Drop whatever never ran: global lanes, then the exited workers'
        // deques via their stealers.
        let dropped_global = self.shared.global.clear();
        let mut dropped_local = 0;
        for stealer in &self.shared.stealers {
            loop {
                match stealer.steal() {
                    Steal::Success(_) => dropped_local += 1,
                    Steal::Retry => continue,
                    Steal::Empty => break,
                }
            }
        }
        if dropped_global + dropped_local > 0 {
            debug!(
                global = dropped_global,
                local = dropped_local,
                "dropped queued tasks at shutdown"
            );
        }

        let _ = self
            .shared
            .transition(SchedulerState::Stopping, SchedulerState::Stopped);

        if stragglers > 0 {
            warn!(stragglers, "workers did not join within shutdown timeout");
            return Err(SchedulerError::JoinTimeout {
                stragglers,
                timeout: self.shared.config.shutdown_timeout,
            });
        }
        Ok(())
    }

    /// Per-worker counter snapshots, indexed by worker.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.shared
            .worker_counters
            .iter()
            .map(WorkerCounters::snapshot)
            .collect()
    }

    /// Tasks currently queued globally (racy snapshot).
    pub fn global_queue_len(&self) -> usize {
        self.shared.global.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.shared.state() == SchedulerState::Running {
            let _ = self.stop();
        }
    }
}
