//! Shared identifier and addressing types.

pub mod ids;
pub mod path;

pub use ids::{ActorId, MessageId};
pub use path::ActorPath;
