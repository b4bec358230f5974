//! # strand-rt — in-process actor runtime
//!
//! A high-throughput actor runtime: actors own private state, communicate
//! only by asynchronous messages, and execute on a fixed pool of OS worker
//! threads via work stealing.
//!
//! # Quick Start
//!
//! ```rust
//! use strand_rt::prelude::*;
//!
//! struct Counter {
//!     count: u32,
//! }
//!
//! impl Behavior for Counter {
//!     fn receive(
//!         &mut self,
//!         ctx: &mut ActorContext<'_>,
//!         msg: Message,
//!     ) -> Result<(), BehaviorError> {
//!         match msg.payload.as_str() {
//!             Some("inc") => self.count += 1,
//!             Some("get") => {
//!                 let _ = ctx.reply(Payload::bytes(&self.count.to_le_bytes()));
//!             }
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let system = ActorSystem::new("demo", SystemConfig::default()).unwrap();
//! system.start().unwrap();
//!
//! let counter = system
//!     .spawn(behavior_factory(|| Counter { count: 0 }), Some("counter"))
//!     .unwrap();
//! counter.send(Payload::bytes(b"inc")).unwrap();
//!
//! system.shutdown().unwrap();
//! ```
//!
//! # Architecture
//!
//! - **Messages** (`message`, `alloc`) are tagged records with size-classed
//!   payloads: tiny/small inline, medium from a per-thread pool, large on
//!   the heap.
//! - **Mailboxes** (`mailbox`, `queue`) are bounded lock-free queues in
//!   three shapes (SPSC ring, MPSC, sharded multi-ring) behind one
//!   send/receive/peek/clear contract. Sends never block; overflow fails
//!   fast.
//! - **The scheduler** (`scheduler`) runs worker threads with Chase–Lev
//!   deques, a priority-laned global queue, random-victim stealing, and an
//!   idle backoff ladder.
//! - **Actors** (`actor`, `supervisor`) are run-to-completion behaviors
//!   with a checked lifecycle state machine, per-actor serialization via
//!   an atomic wake-up flag, stashing, and restart-with-budget
//!   supervision.
//! - **The system** (`system`) ties it together: registry, `/user` and
//!   `/system` guardians, watchers, and graceful shutdown.
//!
//! # Guarantees
//!
//! - At most one processing task per actor is in flight at any time;
//!   handler invocations on one actor never overlap.
//! - FIFO per (sender, receiver) on the standard mailbox; FIFO per sender
//!   on the fast mailbox; the sharded mailbox trades all cross-message
//!   ordering for contended throughput.
//! - No ordering across actors, no global clock, no exactly-once delivery
//!   across crashes.
//! - Handlers are synchronous and run to completion; blocking I/O belongs
//!   on a dedicated pool outside this runtime.

pub mod actor;
pub mod alloc;
pub mod mailbox;
pub mod message;
pub mod prelude;
pub mod queue;
pub mod scheduler;
pub mod supervisor;
pub mod system;
pub mod util;

pub use actor::{
    behavior_factory, ActorContext, ActorRef, ActorState, Behavior, BehaviorError,
    BehaviorFactory, SendError,
};
pub use mailbox::{Mailbox, MailboxError, MailboxVariant};
pub use message::{Message, MessageKind, Payload, Priority, SystemTag};
pub use supervisor::{RestartPolicy, SupervisorStrategy};
pub use system::{ActorSystem, SystemConfig, SystemError, SystemState};
pub use util::{ActorId, ActorPath, MessageId};
