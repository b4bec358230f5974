//! The actor system: lifecycle, registry, guardians, configuration.

pub(crate) mod actor_system;
pub mod builder;
pub mod config;
pub mod errors;
mod guardian;
pub(crate) mod registry;
pub mod selection;

pub use actor_system::{ActorSystem, SystemState};
pub use builder::SpawnBuilder;
pub use config::{
    SystemConfig, SystemConfigBuilder, DEFAULT_BATCH_SIZE, DEFAULT_GLOBAL_QUEUE_CAPACITY,
    DEFAULT_IDLE_SLEEP, DEFAULT_MAILBOX_CAPACITY, DEFAULT_MAX_RESTARTS,
    DEFAULT_MAX_STEAL_ATTEMPTS, DEFAULT_RESTART_WINDOW, DEFAULT_SHUTDOWN_TIMEOUT,
    DEFAULT_SYSTEM_QUEUE_CAPACITY, DEFAULT_WORKER_QUEUE_CAPACITY, MAX_BATCH_SIZE,
};
pub use errors::SystemError;
pub use selection::ActorSelection;

pub(crate) use actor_system::SystemShared;
