//! Actors: behavior trait, lifecycle, context, refs, and the cell.

pub(crate) mod cell;

pub mod actor_ref;
pub mod context;
pub mod lifecycle;
pub mod stats;
pub mod traits;

pub use actor_ref::{ActorRef, SendError};
pub use context::ActorContext;
pub use lifecycle::{ActorError, ActorState, StateCell};
pub use stats::{ActorStats, ActorStatsSnapshot};
pub use traits::{behavior_factory, Behavior, BehaviorError, BehaviorFactory, BoxBehavior};
