//! The per-invocation actor context.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::actor_ref::{ActorRef, SendError};
use super::cell::ActorCell;
use super::traits::{Behavior, BehaviorFactory, BoxBehavior};
use crate::message::{Message, Payload};
use crate::system::{ActorSystem, SystemError, SystemShared};
use crate::util::{ActorId, ActorPath};

/// Deferred effects a behavior requested during one invocation; the cell
/// applies them after the hook returns.
#[derive(Default)]
pub(crate) struct ContextOps {
    pub(crate) next_behavior: Option<BoxBehavior>,
    pub(crate) stop_requested: bool,
}

/// Capabilities handed to every behavior hook invocation.
///
/// Carries the current message's sender, this actor's place in the tree,
/// and the operations an actor may perform on itself and its children.
pub struct ActorContext<'a> {
    cell: &'a Arc<ActorCell>,
    shared: &'a Arc<SystemShared>,
    sender: Option<ActorId>,
    reply_to: Option<ActorId>,
    ops: ContextOps,
}

impl<'a> ActorContext<'a> {
    pub(crate) fn new(cell: &'a Arc<ActorCell>, shared: &'a Arc<SystemShared>) -> Self {
        Self {
            cell,
            shared,
            sender: None,
            reply_to: None,
            ops: ContextOps::default(),
        }
    }

    pub(crate) fn set_current(&mut self, sender: Option<ActorId>, reply_to: Option<ActorId>) {
        self.sender = sender;
        self.reply_to = reply_to;
    }

    pub(crate) fn take_ops(&mut self) -> ContextOps {
        std::mem::take(&mut self.ops)
    }

    /// This actor's own ref.
    pub fn myself(&self) -> ActorRef {
        ActorRef::from_cell(self.cell)
    }

    /// This actor's id.
    pub fn id(&self) -> ActorId {
        self.cell.id()
    }

    /// This actor's path.
    pub fn path(&self) -> &ActorPath {
        self.cell.path()
    }

    /// Sender id of the current message, when stamped.
    pub fn sender_id(&self) -> Option<ActorId> {
        self.sender
    }

    /// Resolved sender ref of the current message.
    pub fn sender(&self) -> Option<ActorRef> {
        self.sender.and_then(|id| self.shared.resolve_id(id))
    }

    /// Reply to the current message: to its `reply_to` when set, else to
    /// its sender.
    pub fn reply(&self, payload: Payload) -> Result<(), SendError> {
        let target_id = self
            .reply_to
            .or(self.sender)
            .ok_or(SendError::ActorTerminated(ActorId::from_raw(0)))?;
        let target = self
            .shared
            .resolve_id(target_id)
            .ok_or(SendError::ActorTerminated(target_id))?;
        target.send_msg(Message::user(payload).with_sender(self.cell.id()))
    }

    /// The parent's ref, while the parent is alive. `None` for guardians
    /// at the root.
    pub fn parent(&self) -> Option<ActorRef> {
        self.cell
            .parent_id()
            .and_then(|id| self.shared.resolve_id(id))
    }

    /// Refs of the currently live children.
    pub fn children(&self) -> Vec<ActorRef> {
        self.cell
            .child_ids()
            .into_iter()
            .filter_map(|id| self.shared.resolve_id(id))
            .collect()
    }

    /// Spawn a child of this actor. With `None`, a unique name is
    /// generated.
    pub fn spawn_child(
        &self,
        factory: BehaviorFactory,
        name: Option<&str>,
    ) -> Result<ActorRef, SystemError> {
        self.shared
            .spawn_cell(Some(self.cell), factory, name.map(str::to_owned), None, None)
    }

    /// Request a graceful stop of this actor once the current message
    /// completes.
    pub fn stop_self(&mut self) {
        self.ops.stop_requested = true;
    }

    /// Replace this actor's behavior after the current message ("become").
    /// The stash survives; use [`ActorContext::unstash_all`] to replay
    /// messages deferred by the previous behavior.
    pub fn replace_behavior(&mut self, behavior: impl Behavior) {
        self.ops.next_behavior = Some(Box::new(behavior));
    }

    /// Defer a message: it is appended to this actor's stash.
    pub fn stash(&self, msg: Message) {
        self.cell.stash_message(msg);
    }

    /// Re-send every stashed message to self, in original order. Returns
    /// how many messages were replayed.
    pub fn unstash_all(&self) -> usize {
        self.cell.unstash_all()
    }

    /// Register this actor to receive `Terminated` when `other` reaches a
    /// terminal state.
    pub fn watch(&self, other: &ActorRef) {
        self.shared.watch(self.cell.id(), other);
    }

    /// Remove a watch registration.
    pub fn unwatch(&self, other: &ActorRef) {
        self.shared.unwatch(self.cell.id(), other.id());
    }

    /// Handle to the owning system.
    pub fn system(&self) -> ActorSystem {
        ActorSystem::from_shared(Arc::clone(self.shared))
    }
}
