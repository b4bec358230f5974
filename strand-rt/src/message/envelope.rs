//! The message record: type tag, metadata, payload.

// Layer 1: Standard library imports
use std::time::{SystemTime, UNIX_EPOCH};

// Layer 2: Third-party crate imports
use uuid::Uuid;

// Layer 3: Internal module imports
use super::payload::Payload;
use super::tags::{MessageKind, Priority, SystemTag};
use crate::util::{ActorId, MessageId};

/// Default delivery-attempt budget carried in metadata.
pub const DEFAULT_MAX_RETRIES: u8 = 3;

/// Per-message metadata.
///
/// Stamped at construction; the send path fills `sender` and `receiver`.
/// TTL expiry is a consumer-side policy hook, never enforced by the
/// transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Process-unique monotonic message id.
    pub message_id: MessageId,
    /// Nanoseconds since the Unix epoch at construction.
    pub timestamp_ns: u64,
    /// Stamped by the sending actor, when known.
    pub sender: Option<ActorId>,
    /// Stamped by the send path.
    pub receiver: Option<ActorId>,
    /// Request/response correlation.
    pub correlation_id: Option<Uuid>,
    /// Where replies should go, for request/reply built from two sends.
    pub reply_to: Option<ActorId>,
    /// Best-effort time-to-live in nanoseconds.
    pub ttl_ns: Option<u64>,
    /// Delivery attempts consumed so far.
    pub retries: u8,
    /// Delivery-attempt budget.
    pub max_retries: u8,
    /// Dispatch priority.
    pub priority: Priority,
    /// Distributed-tracing correlation.
    pub trace_id: Option<Uuid>,
}

impl Metadata {
    fn stamped(priority: Priority) -> Self {
        Self {
            message_id: MessageId::next(),
            timestamp_ns: now_ns(),
            sender: None,
            receiver: None,
            correlation_id: None,
            reply_to: None,
            ttl_ns: None,
            retries: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            priority,
            trace_id: None,
        }
    }
}

/// Nanoseconds since the Unix epoch.
pub(crate) fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// A message: `{ kind, metadata, payload }`.
///
/// # Example
/// ```rust
/// use strand_rt::message::{Message, Payload, Priority};
///
/// let msg = Message::user(Payload::bytes(b"inc")).with_ttl_ns(5_000_000_000);
/// assert_eq!(msg.payload.as_str(), Some("inc"));
/// assert_eq!(msg.metadata.priority, Priority::Normal);
/// assert!(!msg.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Top-level classification.
    pub kind: MessageKind,
    /// Delivery metadata.
    pub metadata: Metadata,
    /// Opaque payload.
    pub payload: Payload,
}

impl Message {
    /// A user message carrying `payload`.
    pub fn user(payload: Payload) -> Self {
        Self {
            kind: MessageKind::User,
            metadata: Metadata::stamped(Priority::Normal),
            payload,
        }
    }

    /// A runtime-internal message for `tag`, at the tag's fixed priority.
    pub fn system(tag: SystemTag) -> Self {
        Self {
            kind: MessageKind::System(tag),
            metadata: Metadata::stamped(tag.priority()),
            payload: Payload::None,
        }
    }

    /// An embedder control message.
    pub fn control(tag: u32, payload: Payload) -> Self {
        let kind = MessageKind::Control(tag);
        Self {
            kind,
            metadata: Metadata::stamped(kind.priority()),
            payload,
        }
    }

    /// Builder: stamp the sending actor.
    pub fn with_sender(mut self, sender: ActorId) -> Self {
        self.metadata.sender = Some(sender);
        self
    }

    /// Builder: stamp the reply target.
    pub fn with_reply_to(mut self, reply_to: ActorId) -> Self {
        self.metadata.reply_to = Some(reply_to);
        self
    }

    /// Builder: stamp a correlation id.
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.metadata.correlation_id = Some(id);
        self
    }

    /// Builder: stamp a trace id.
    pub fn with_trace_id(mut self, id: Uuid) -> Self {
        self.metadata.trace_id = Some(id);
        self
    }

    /// Builder: best-effort time-to-live.
    pub fn with_ttl_ns(mut self, ttl_ns: u64) -> Self {
        self.metadata.ttl_ns = Some(ttl_ns);
        self
    }

    /// Builder: override the dispatch priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.metadata.priority = priority;
        self
    }

    /// The system tag, when this is a system message.
    pub fn system_tag(&self) -> Option<SystemTag> {
        match self.kind {
            MessageKind::System(tag) => Some(tag),
            _ => None,
        }
    }

    /// Whether the TTL (if any) has elapsed. Best effort: consumers may
    /// drop expired messages at receive time; the transport never does.
    pub fn is_expired(&self) -> bool {
        match self.metadata.ttl_ns {
            Some(ttl) => now_ns().saturating_sub(self.metadata.timestamp_ns) > ttl,
            None => false,
        }
    }
}
