//! Fluent per-actor spawn configuration.

// Layer 1: Standard library
// (none)

// Layer 2: Third-party
// (none)

// Layer 3: Internal
use super::actor_system::ActorSystem;
use super::errors::SystemError;
use crate::actor::{ActorRef, BehaviorFactory};
use crate::mailbox::MailboxVariant;

/// Builder returned by [`ActorSystem::spawn_builder`].
///
/// # Example
/// ```rust,no_run
/// # use strand_rt::prelude::*;
/// # struct Hot;
/// # impl Behavior for Hot {}
/// # let system = ActorSystem::new("demo", SystemConfig::default()).unwrap();
/// # system.start().unwrap();
/// let hot = system
///     .spawn_builder(behavior_factory(|| Hot))
///     .with_name("hot-path")
///     .with_mailbox_variant(MailboxVariant::Sharded)
///     .with_mailbox_capacity(131_072)
///     .spawn()
///     .unwrap();
/// ```
pub struct SpawnBuilder<'a> {
    system: &'a ActorSystem,
    factory: BehaviorFactory,
    name: Option<String>,
    mailbox_variant: Option<MailboxVariant>,
    mailbox_capacity: Option<usize>,
}

impl<'a> SpawnBuilder<'a> {
    pub(crate) fn new(system: &'a ActorSystem, factory: BehaviorFactory) -> Self {
        Self {
            system,
            factory,
            name: None,
            mailbox_variant: None,
            mailbox_capacity: None,
        }
    }

    /// Name the actor (path segment under `/user`).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the system's default mailbox shape for this actor.
    pub fn with_mailbox_variant(mut self, variant: MailboxVariant) -> Self {
        self.mailbox_variant = Some(variant);
        self
    }

    /// Override the mailbox capacity for this actor (power of two;
    /// rounded up if not).
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = Some(capacity);
        self
    }

    /// Create the actor.
    pub fn spawn(self) -> Result<ActorRef, SystemError> {
        self.system.shared().spawn_cell(
            None,
            self.factory,
            self.name,
            self.mailbox_variant,
            self.mailbox_capacity,
        )
    }
}
