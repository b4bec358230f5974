//! Convenience re-exports for embedders.
//!
//! ```rust
//! use strand_rt::prelude::*;
//! ```

pub use crate::actor::{
    behavior_factory, ActorContext, ActorRef, ActorState, Behavior, BehaviorError,
    BehaviorFactory, SendError,
};
pub use crate::mailbox::{MailboxError, MailboxVariant};
pub use crate::message::{Message, MessageKind, Payload, Priority, SystemTag};
pub use crate::supervisor::{RestartPolicy, SupervisorStrategy};
pub use crate::system::{ActorSystem, SystemConfig, SystemError, SystemState};
pub use crate::util::{ActorId, ActorPath, MessageId};
