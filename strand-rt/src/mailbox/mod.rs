//! Per-actor mailboxes.
//!
//! A mailbox is a bounded queue of [`Message`]s owned by exactly one
//! actor, polymorphic over three shapes:
//!
//! - [`MailboxVariant::Standard`] — SPSC ring. Producers are serialized
//!   with a light lock, so single-sender workloads never contend it and
//!   FIFO holds per (producer, consumer) pair.
//! - [`MailboxVariant::Fast`] — lock-free MPSC. Many concurrent senders;
//!   FIFO per sender, arbitrary interleaving across senders.
//! - [`MailboxVariant::Sharded`] — four-ring fan-in. Highest send
//!   throughput under contention; FIFO only per (sender, chosen ring), so
//!   total order is not preserved even for a single sender.
//!
//! Uniform contract: `send` / `try_recv` / `peek_with` / `clear` plus the
//! batch forms. `send` fails with [`MailboxError::Full`] at capacity and
//! never blocks; an empty receive is `None`, not an error. Consumption is
//! exclusive to the owning actor's processing task; the receiver side sits
//! behind a mutex that is never contended in steady state.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Layer 3: Internal module imports
use crate::message::Message;
use crate::queue::{mpsc, sharded, spsc};
use crate::queue::{MpscReceiver, MpscSender, ShardedReceiver, ShardedSender, SpscConsumer, SpscProducer};

/// Mailbox shape, chosen per system (or per actor via the spawn builder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailboxVariant {
    /// SPSC ring with lock-serialized producers.
    Standard,
    /// Lock-free MPSC queue.
    Fast,
    /// Sharded multi-ring; sacrifices single-sender FIFO.
    Sharded,
}

impl Default for MailboxVariant {
    fn default() -> Self {
        Self::Standard
    }
}

/// Mailbox send failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MailboxError {
    /// The mailbox is at capacity; the message was dropped.
    #[error("mailbox full (capacity {capacity})")]
    Full {
        /// The configured capacity that was hit.
        capacity: usize,
    },
}

enum SenderSide {
    Standard(std::sync::Arc<Mutex<SpscProducer<Message>>>),
    Fast(MpscSender<Message>),
    Sharded(ShardedSender<Message>),
}

impl Clone for SenderSide {
    fn clone(&self) -> Self {
        match self {
            SenderSide::Standard(p) => SenderSide::Standard(std::sync::Arc::clone(p)),
            SenderSide::Fast(tx) => SenderSide::Fast(tx.clone()),
            SenderSide::Sharded(tx) => SenderSide::Sharded(tx.clone()),
        }
    }
}

enum ReceiverSide {
    Standard(SpscConsumer<Message>),
    Fast(MpscReceiver<Message>),
    Sharded(ShardedReceiver<Message>),
}

/// A bounded per-actor message queue.
pub struct Mailbox {
    sender: SenderSide,
    receiver: Mutex<ReceiverSide>,
    capacity: usize,
}

impl Mailbox {
    /// Create a mailbox of the given shape with at least `capacity` slots
    /// (rounded up to a power of two; the sharded shape rounds per ring).
    pub fn new(variant: MailboxVariant, capacity: usize) -> Self {
        match variant {
            MailboxVariant::Standard => {
                let (tx, rx) = spsc::ring(capacity);
                Self {
                    capacity: tx.capacity(),
                    sender: SenderSide::Standard(std::sync::Arc::new(Mutex::new(tx))),
                    receiver: Mutex::new(ReceiverSide::Standard(rx)),
                }
            }
            MailboxVariant::Fast => {
                let (tx, rx) = mpsc::queue(capacity);
                Self {
                    capacity: tx.capacity(),
                    sender: SenderSide::Fast(tx),
                    receiver: Mutex::new(ReceiverSide::Fast(rx)),
                }
            }
            MailboxVariant::Sharded => {
                let (tx, rx) = sharded::queue(capacity);
                Self {
                    capacity: tx.capacity(),
                    sender: SenderSide::Sharded(tx),
                    receiver: Mutex::new(ReceiverSide::Sharded(rx)),
                }
            }
        }
    }

    /// Enqueue one message. Never blocks; at capacity the message is
    /// dropped (its owned payload freed) and [`MailboxError::Full`] is
    /// returned.
    pub fn send(&self, message: Message) -> Result<(), MailboxError> {
        let rejected = match &self.sender {
            SenderSide::Standard(producer) => producer.lock().push(message).err(),
            SenderSide::Fast(tx) => tx.push(message).err(),
            SenderSide::Sharded(tx) => tx.push(message).err(),
        };
        match rejected {
            None => Ok(()),
            Some(_dropped) => Err(MailboxError::Full {
                capacity: self.capacity,
            }),
        }
    }

    /// Enqueue from the front of `messages` until full; returns how many
    /// were accepted. Leftovers stay in `messages` in order.
    pub fn send_batch(&self, messages: &mut Vec<Message>) -> usize {
        match &self.sender {
            SenderSide::Standard(producer) => producer.lock().push_batch(messages),
            SenderSide::Fast(tx) => tx.push_batch(messages),
            SenderSide::Sharded(tx) => {
                let mut accepted = 0;
                let mut iter = std::mem::take(messages).into_iter();
                for message in iter.by_ref() {
                    match tx.push(message) {
                        Ok(()) => accepted += 1,
                        Err(back) => {
                            messages.push(back);
                            break;
                        }
                    }
                }
                messages.extend(iter);
                accepted
            }
        }
    }

    /// Dequeue one message, or `None` when empty.
    pub fn try_recv(&self) -> Option<Message> {
        match &mut *self.receiver.lock() {
            ReceiverSide::Standard(rx) => rx.pop(),
            ReceiverSide::Fast(rx) => rx.pop(),
            ReceiverSide::Sharded(rx) => rx.pop(),
        }
    }

    /// Dequeue up to `max` messages into `out`; returns how many moved.
    pub fn recv_batch(&self, out: &mut Vec<Message>, max: usize) -> usize {
        match &mut *self.receiver.lock() {
            ReceiverSide::Standard(rx) => rx.pop_batch(out, max),
            ReceiverSide::Fast(rx) => rx.pop_batch(out, max),
            ReceiverSide::Sharded(rx) => rx.pop_batch(out, max),
        }
    }

    /// Run `f` on the next message (if any) without consuming it.
    pub fn peek_with<R>(&self, f: impl FnOnce(Option<&Message>) -> R) -> R {
        match &mut *self.receiver.lock() {
            ReceiverSide::Standard(rx) => f(rx.peek()),
            ReceiverSide::Fast(rx) => f(rx.peek()),
            ReceiverSide::Sharded(rx) => f(rx.peek()),
        }
    }

    /// Drop every buffered message; owned payloads are freed exactly once.
    /// Returns how many messages were discarded.
    pub fn clear(&self) -> usize {
        match &mut *self.receiver.lock() {
            ReceiverSide::Standard(rx) => rx.clear(),
            ReceiverSide::Fast(rx) => rx.clear(),
            ReceiverSide::Sharded(rx) => rx.clear(),
        }
    }

    /// Buffered messages (racy snapshot).
    pub fn len(&self) -> usize {
        match &self.sender {
            SenderSide::Standard(producer) => producer.lock().len(),
            SenderSide::Fast(tx) => tx.len(),
            SenderSide::Sharded(tx) => tx.len(),
        }
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rounded capacity actually allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
