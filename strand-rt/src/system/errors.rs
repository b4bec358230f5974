//! System-level error types.

// Layer 1: Standard library
use std::time::Duration;

// Layer 2: Third-party
use thiserror::Error;

// Layer 3: Internal
use crate::scheduler::SchedulerError;

/// Errors from actor-system operations.
#[derive(Debug, Error)]
pub enum SystemError {
    /// Registry lookup miss.
    #[error("actor not found: {0}")]
    ActorNotFound(String),

    /// Duplicate path on spawn.
    #[error("actor already exists at {0}")]
    ActorAlreadyExists(String),

    /// The requested name is not a valid path segment.
    #[error("invalid actor name: {0:?}")]
    InvalidName(String),

    /// Operation on a system past terminating.
    #[error("actor system is shut down")]
    SystemShutdown,

    /// Graceful shutdown exceeded its deadline.
    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    /// Configuration validation failed.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Actor construction failed.
    #[error("failed to spawn actor: {0}")]
    SpawnFailed(String),

    /// Scheduler failure during start or stop.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl SystemError {
    /// Whether retrying the operation can succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, SystemError::Scheduler(SchedulerError::QueueFull))
    }

    /// Whether the system is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SystemError::SystemShutdown | SystemError::ShutdownTimeout(_)
        )
    }
}
