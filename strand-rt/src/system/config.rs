//! System configuration with sensible defaults.

// Layer 1: Standard library
use std::time::Duration;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
use crate::mailbox::MailboxVariant;
use crate::scheduler::SchedulerConfig;
use crate::supervisor::RestartPolicy;

/// Default per-actor mailbox capacity (power of two).
pub const DEFAULT_MAILBOX_CAPACITY: usize = 65_536;

/// Default per-worker local deque capacity (power of two).
pub const DEFAULT_WORKER_QUEUE_CAPACITY: usize = 4096;

/// Default capacity of each global-queue priority lane (power of two).
pub const DEFAULT_GLOBAL_QUEUE_CAPACITY: usize = 32_768;

/// Default messages per processing task.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Hard upper bound on the batch size.
pub const MAX_BATCH_SIZE: usize = 128;

/// Default steal attempts per idle pass.
pub const DEFAULT_MAX_STEAL_ATTEMPTS: usize = 3;

/// Default deep-idle worker sleep.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Default restart budget within the restart window.
pub const DEFAULT_MAX_RESTARTS: u32 = 3;

/// Default restart window.
pub const DEFAULT_RESTART_WINDOW: Duration = Duration::from_millis(60_000);

/// Default graceful shutdown deadline.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default per-actor system queue capacity (power of two).
pub const DEFAULT_SYSTEM_QUEUE_CAPACITY: usize = 256;

/// System-wide configuration for the actor runtime.
///
/// # Examples
///
/// ```rust
/// use strand_rt::system::{SystemConfig, DEFAULT_MAILBOX_CAPACITY};
///
/// let config = SystemConfig::default();
/// assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
///
/// let config = SystemConfig::builder()
///     .with_worker_threads(4)
///     .with_mailbox_capacity(1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.worker_threads, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Scheduler worker threads; 0 detects the CPU count.
    pub worker_threads: usize,

    /// Per-actor mailbox capacity. Must be a power of two.
    pub mailbox_capacity: usize,

    /// Per-worker local deque capacity. Must be a power of two.
    pub worker_queue_capacity: usize,

    /// Capacity of each global-queue priority lane. Must be a power of two.
    pub global_queue_capacity: usize,

    /// Messages one processing task handles before re-queueing the actor.
    /// Clamped to [`MAX_BATCH_SIZE`].
    pub batch_size: usize,

    /// Steal attempts per idle pass.
    pub max_steal_attempts: usize,

    /// Deep-idle worker sleep duration.
    pub idle_sleep: Duration,

    /// Restarts tolerated within `restart_window`.
    pub max_restarts: u32,

    /// Width of the restart budget window.
    pub restart_window: Duration,

    /// Deadline applied to graceful shutdown and worker joins.
    pub shutdown_timeout: Duration,

    /// Whether workers steal from each other at all.
    pub enable_work_stealing: bool,

    /// Default mailbox shape for spawned actors.
    pub mailbox_variant: MailboxVariant,

    /// Per-actor system queue capacity. Must be a power of two.
    pub system_queue_capacity: usize,

    /// Whether a graceful stop processes remaining mailbox messages
    /// before `post_stop` (a kill never drains).
    pub drain_on_stop: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            worker_queue_capacity: DEFAULT_WORKER_QUEUE_CAPACITY,
            global_queue_capacity: DEFAULT_GLOBAL_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            max_steal_attempts: DEFAULT_MAX_STEAL_ATTEMPTS,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            max_restarts: DEFAULT_MAX_RESTARTS,
            restart_window: DEFAULT_RESTART_WINDOW,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            enable_work_stealing: true,
            mailbox_variant: MailboxVariant::Standard,
            system_queue_capacity: DEFAULT_SYSTEM_QUEUE_CAPACITY,
            drain_on_stop: true,
        }
    }
}

impl SystemConfig {
    /// Create a configuration builder.
    pub fn builder() -> SystemConfigBuilder {
        SystemConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        for (label, value) in [
            ("mailbox_capacity", self.mailbox_capacity),
            ("worker_queue_capacity", self.worker_queue_capacity),
            ("global_queue_capacity", self.global_queue_capacity),
            ("system_queue_capacity", self.system_queue_capacity),
        ] {
            if value == 0 || !value.is_power_of_two() {
                return Err(format!("{label} must be a nonzero power of two, got {value}"));
            }
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(format!(
                "batch_size must be in 1..={MAX_BATCH_SIZE}, got {}",
                self.batch_size
            ));
        }

        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be > 0".to_string());
        }

        if self.restart_window.is_zero() {
            return Err("restart_window must be > 0".to_string());
        }

        Ok(())
    }

    /// The scheduler's slice of this configuration.
    pub(crate) fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            worker_threads: self.worker_threads,
            worker_queue_capacity: self.worker_queue_capacity,
            global_queue_capacity: self.global_queue_capacity,
            max_steal_attempts: self.max_steal_attempts,
            idle_sleep: self.idle_sleep,
            enable_work_stealing: self.enable_work_stealing,
            shutdown_timeout: self.shutdown_timeout,
        }
    }

    /// The supervision slice of this configuration.
    pub(crate) fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            max_restarts: self.max_restarts,
            window: self.restart_window,
        }
    }
}

/// Builder for [`SystemConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct SystemConfigBuilder {
    config: SystemConfig,
}

impl SystemConfigBuilder {
    /// Set the number of scheduler worker threads (0 = detect).
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.config.worker_threads = workers;
        self
    }

    /// Set the per-actor mailbox capacity (power of two).
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.mailbox_capacity = capacity;
        self
    }

    /// Set the per-worker deque capacity (power of two).
    pub fn with_worker_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.worker_queue_capacity = capacity;
        self
    }

    /// Set each global lane's capacity (power of two).
    pub fn with_global_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.global_queue_capacity = capacity;
        self
    }

    /// Set messages per processing task (clamped to [`MAX_BATCH_SIZE`]).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set steal attempts per idle pass.
    pub fn with_max_steal_attempts(mut self, attempts: usize) -> Self {
        self.config.max_steal_attempts = attempts;
        self
    }

    /// Set the deep-idle sleep duration.
    pub fn with_idle_sleep(mut self, sleep: Duration) -> Self {
        self.config.idle_sleep = sleep;
        self
    }

    /// Set the restart budget.
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.config.max_restarts = max_restarts;
        self
    }

    /// Set the restart budget window.
    pub fn with_restart_window(mut self, window: Duration) -> Self {
        self.config.restart_window = window;
        self
    }

    /// Set the graceful shutdown deadline.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Enable or disable work stealing.
    pub fn with_work_stealing(mut self, enabled: bool) -> Self {
        self.config.enable_work_stealing = enabled;
        self
    }

    /// Set the default mailbox shape.
    pub fn with_mailbox_variant(mut self, variant: MailboxVariant) -> Self {
        self.config.mailbox_variant = variant;
        self
    }

    /// Set the per-actor system queue capacity (power of two).
    pub fn with_system_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.system_queue_capacity = capacity;
        self
    }

    /// Enable or disable draining on graceful stop.
    pub fn with_drain_on_stop(mut self, drain: bool) -> Self {
        self.config.drain_on_stop = drain;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<SystemConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
