//! Message representation: type tags, metadata, and size-classed payloads.

pub mod envelope;
pub mod payload;
pub mod tags;

pub use envelope::{Message, Metadata, DEFAULT_MAX_RETRIES};
pub use payload::{ByteBuf, Payload, SizeClass, LARGE_MAX, MEDIUM_MAX, SMALL_MAX, TINY_MAX};
pub use tags::{MessageKind, Priority, SystemTag};
