//! The behavior capability set.

// Layer 1: Standard library imports
use std::error::Error;
use std::fmt;

// Layer 2: Third-party crate imports
use thiserror::Error as ThisError;

// Layer 3: Internal module imports
use super::context::ActorContext;
use crate::message::Message;
use crate::supervisor::SupervisorStrategy;

/// Failure raised by a behavior hook.
///
/// Opaque to the runtime: it carries a human-readable message and an
/// optional source, and feeds the supervision strategy.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct BehaviorError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl BehaviorError {
    /// A failure described by a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A failure wrapping an underlying error.
    pub fn with_source(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for BehaviorError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BehaviorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// What an actor *does*: the fixed set of lifecycle hooks bound at spawn.
///
/// All hooks run on scheduler workers, serialized per actor — at most one
/// hook of one actor executes at any time, so `&mut self` state needs no
/// locking. Hooks are run-to-completion: no blocking on other actors, no
/// async.
///
/// # Example
/// ```rust
/// use strand_rt::actor::{ActorContext, Behavior, BehaviorError};
/// use strand_rt::message::Message;
///
/// struct Counter {
///     count: u64,
/// }
///
/// impl Behavior for Counter {
///     fn receive(
///         &mut self,
///         _ctx: &mut ActorContext<'_>,
///         msg: Message,
///     ) -> Result<(), BehaviorError> {
///         if msg.payload.as_str() == Some("inc") {
///             self.count += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Behavior: Send + 'static {
    /// Handle one message. Default: ignore it.
    ///
    /// An `Err` feeds [`Behavior::supervisor_strategy`]; an `Ok` counts as
    /// consumed.
    fn receive(&mut self, ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        let _ = (ctx, msg);
        Ok(())
    }

    /// Runs before the first message. Errors are logged, not fatal.
    fn pre_start(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs after the actor stops accepting work. Errors are logged.
    fn post_stop(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs on the *old* instance just before a supervised restart.
    fn pre_restart(&mut self, ctx: &mut ActorContext<'_>, reason: &BehaviorError) {
        let _ = (ctx, reason);
    }

    /// Runs on the *fresh* instance just after a supervised restart.
    fn post_restart(&mut self, ctx: &mut ActorContext<'_>) {
        let _ = ctx;
    }

    /// Strategy applied when `receive` fails, and when a descendant
    /// escalates to this actor.
    fn supervisor_strategy(&self) -> SupervisorStrategy {
        SupervisorStrategy::Restart
    }
}

/// Boxed behavior, as stored in the actor cell.
pub type BoxBehavior = Box<dyn Behavior>;

/// Factory rebuilding a fresh behavior instance; bound at spawn, reused on
/// every supervised restart.
pub type BehaviorFactory = std::sync::Arc<dyn Fn() -> BoxBehavior + Send + Sync>;

/// Wrap a closure as a [`BehaviorFactory`].
pub fn behavior_factory<B, F>(f: F) -> BehaviorFactory
where
    B: Behavior,
    F: Fn() -> B + Send + Sync + 'static,
{
    std::sync::Arc::new(move || Box::new(f()) as BoxBehavior)
}

impl fmt::Debug for dyn Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Behavior")
    }
}
