//! The actor cell: mailbox binding, batch processing, supervision.
//!
//! One cell owns everything one actor is: its mailboxes, behavior slot,
//! lifecycle state, statistics, stash, and tree links. The scheduler only
//! ever runs one processing task per cell at a time (the `scheduled` flag
//! guarantees it), so the cell's dock mutex is never contended in steady
//! state; it exists to make the take/put of the behavior sound.

// Layer 1: Standard library imports
use std::collections::HashSet;
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

// Layer 3: Internal module imports
use super::actor_ref::{ActorRef, SendError};
use super::context::ActorContext;
use super::lifecycle::{ActorState, StateCell};
use super::stats::ActorStats;
use super::traits::{BehaviorError, BehaviorFactory, BoxBehavior};
use crate::mailbox::{Mailbox, MailboxVariant};
use crate::message::{Message, MessageKind, Priority, SystemTag};
use crate::queue::{mpsc, MpscReceiver, MpscSender};
use crate::scheduler::{Runnable, Task};
use crate::supervisor::{RestartPolicy, RestartWindow, SupervisorStrategy};
use crate::system::SystemShared;
use crate::util::{ActorId, ActorPath};

/// Behavior slot plus the bookkeeping only the serialized task touches.
struct Dock {
    behavior: Option<BoxBehavior>,
    stash: Vec<Message>,
    restart_window: RestartWindow,
}

/// Everything one actor owns.
pub(crate) struct ActorCell {
    id: ActorId,
    path: ActorPath,
    state: StateCell,
    mailbox: Mailbox,
    system_tx: MpscSender<Message>,
    system_rx: Mutex<MpscReceiver<Message>>,
    dock: Mutex<Dock>,
    factory: BehaviorFactory,
    stats: ActorStats,
    parent: Option<ActorId>,
    children: Mutex<HashSet<ActorId>>,
    /// Wake-up flag: true while a processing task is queued or running.
    scheduled: AtomicBool,
    system: Weak<SystemShared>,
    /// Back-reference for minting refs and tasks from `&self`.
    self_ref: Weak<ActorCell>,
    restart_policy: RestartPolicy,
    batch_size: usize,
    drain_on_stop: bool,
    spawned_at: DateTime<Utc>,
}

impl ActorCell {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ActorId,
        path: ActorPath,
        parent: Option<ActorId>,
        factory: BehaviorFactory,
        variant: MailboxVariant,
        mailbox_capacity: usize,
        system_queue_capacity: usize,
        batch_size: usize,
        drain_on_stop: bool,
        restart_policy: RestartPolicy,
        system: Weak<SystemShared>,
    ) -> Arc<Self> {
        let behavior = factory();
        let (system_tx, system_rx) = mpsc::queue(system_queue_capacity);
        Arc::new_cyclic(|self_ref| Self {
            id,
            path,
            state: StateCell::new(),
            mailbox: Mailbox::new(variant, mailbox_capacity),
            system_tx,
            system_rx: Mutex::new(system_rx),
            dock: Mutex::new(Dock {
                behavior: Some(behavior),
                stash: Vec::new(),
                restart_window: RestartWindow::new(),
            }),
            factory,
            stats: ActorStats::default(),
            parent,
            children: Mutex::new(HashSet::new()),
            scheduled: AtomicBool::new(false),
            system,
            self_ref: self_ref.clone(),
            restart_policy,
            batch_size,
            drain_on_stop,
            spawned_at: Utc::now(),
        })
    }

    pub(crate) fn id(&self) -> ActorId {
        self.id
    }

    pub(crate) fn path(&self) -> &ActorPath {
        &self.path
    }

    pub(crate) fn state(&self) -> ActorState {
        self.state.current()
    }

    pub(crate) fn stats(&self) -> &ActorStats {
        &self.stats
    }

    pub(crate) fn spawned_at(&self) -> DateTime<Utc> {
        self.spawned_at
    }

    pub(crate) fn parent_id(&self) -> Option<ActorId> {
        self.parent
    }

    pub(crate) fn child_ids(&self) -> Vec<ActorId> {
        self.children.lock().iter().copied().collect()
    }

    pub(crate) fn add_child(&self, child: ActorId) {
        self.children.lock().insert(child);
    }

    pub(crate) fn remove_child(&self, child: ActorId) {
        self.children.lock().remove(&child);
    }

    pub(crate) fn mailbox_len(&self) -> usize {
        self.mailbox.len()
    }

    /// Final transition, once deregistration is done. A no-op when the
    /// table forbids it (already terminated).
    pub(crate) fn mark_terminated(&self) {
        let _ = self.state.transition_to(ActorState::Terminated);
    }

    pub(crate) fn stash_message(&self, msg: Message) {
        self.dock.lock().stash.push(msg);
    }

    /// Replay the stash into the own mailbox, preserving order.
    pub(crate) fn unstash_all(&self) -> usize {
        let stashed: Vec<Message> = self.dock.lock().stash.drain(..).collect();
        let mut replayed = 0;
        for msg in stashed {
            // Re-entering the mailbox; overflow here drops the message
            // like any other full-mailbox send.
            if self.mailbox.send(msg).is_ok() {
                replayed += 1;
            }
        }
        replayed
    }

    fn upgrade_self(&self) -> Option<Arc<ActorCell>> {
        self.self_ref.upgrade()
    }

    // ------------------------------------------------------------------
    // Send paths
    // ------------------------------------------------------------------

    /// Enqueue a user (or control) message and wake the actor.
    pub(crate) fn send_user(&self, mut msg: Message) -> Result<(), SendError> {
        if let Some(shared) = self.system.upgrade() {
            if shared.is_past_terminating() {
                return Err(SendError::SystemShutdown);
            }
        }
        if !self.state.current().accepts_user_messages() {
            return Err(SendError::ActorTerminated(self.id));
        }
        msg.metadata.receiver = Some(self.id);
        let priority = msg.metadata.priority;
        self.mailbox
            .send(msg)
            .map_err(|_| SendError::MailboxFull)?;
        self.wake(priority);
        Ok(())
    }

    /// Enqueue a runtime system message and wake the actor.
    pub(crate) fn send_system_msg(&self, mut msg: Message) -> Result<(), SendError> {
        if self.state.current().is_terminal() {
            return Err(SendError::ActorTerminated(self.id));
        }
        msg.metadata.receiver = Some(self.id);
        let priority = msg.metadata.priority;
        self.system_tx
            .push(msg)
            .map_err(|_| SendError::MailboxFull)?;
        self.wake(priority);
        Ok(())
    }

    /// Wake-up protocol: CAS the `scheduled` flag and submit a processing
    /// task when this send won the transition.
    fn wake(&self, priority: Priority) {
        // SeqCst fence: orders the enqueue just performed against the flag
        // read below, pairing with the fence in `process`'s park sequence
        // (Dekker pattern). Without it a parking task could miss the
        // message while this send misses the cleared flag.
        fence(Ordering::SeqCst);
        // AcqRel: winning the CAS makes this thread the (sole) submitter;
        // losing it means a task is queued or running and its post-batch
        // double-check will see our message.
        if self
            .scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let (Some(this), Some(shared)) = (self.upgrade_self(), self.system.upgrade()) else {
            self.scheduled.store(false, Ordering::Release);
            return;
        };
        let task = Task::new(Arc::new(MessageTask { cell: this }), priority);
        if let Err(err) = shared.scheduler.submit(task) {
            // The message stays queued; the next send (or system start)
            // retries the wake-up.
            self.scheduled.store(false, Ordering::Release);
            debug!(actor = %self.path, %err, "failed to schedule actor");
        }
    }

    /// Re-issue the wake-up for an actor with queued work (used when the
    /// scheduler comes up after spawns already happened).
    pub(crate) fn rewake(&self) {
        if self.has_pending_work() && !self.state.current().is_terminal() {
            self.wake(Priority::Normal);
        }
    }

    fn has_pending_work(&self) -> bool {
        !self.mailbox.is_empty() || !self.system_tx.is_empty()
    }

    // ------------------------------------------------------------------
    // Processing task
    // ------------------------------------------------------------------

    /// One scheduler task: system drain, then up to `batch_size` user
    /// messages, then system drain again; finally the park/reschedule
    /// double-check.
    pub(crate) fn process(&self) {
        let (Some(this), Some(shared)) = (self.upgrade_self(), self.system.upgrade()) else {
            self.scheduled.store(false, Ordering::Release);
            return;
        };

        let mut behavior = self.dock.lock().behavior.take();

        self.drain_system(&this, &mut behavior, &shared);

        if self.state.current() == ActorState::Running {
            let mut handled = 0;
            while handled < self.batch_size {
                // System traffic (stop, restart) overtakes the user batch.
                if !self.system_tx.is_empty() {
                    self.drain_system(&this, &mut behavior, &shared);
                }
                if self.state.current() != ActorState::Running {
                    break;
                }
                let Some(msg) = self.mailbox.try_recv() else {
                    break;
                };
                self.dispatch_user(&this, &mut behavior, &shared, msg);
                handled += 1;
            }
        }

        self.drain_system(&this, &mut behavior, &shared);

        if behavior.is_some() {
            self.dock.lock().behavior = behavior;
        }

        // Park: clear the flag, fence, then re-check the queues. The
        // fence pairs with the one in `wake` so either this task sees the
        // racing message or the racing send sees the cleared flag.
        self.scheduled.store(false, Ordering::Release);
        fence(Ordering::SeqCst);
        if self.has_pending_work() && !self.state.current().is_terminal() {
            self.wake(Priority::Normal);
        }
    }

    fn dispatch_user(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
        msg: Message,
    ) {
        let started = std::time::Instant::now();
        let (result, ops) = {
            let Some(b) = behavior.as_mut() else { return };
            let mut ctx = ActorContext::new(this, shared);
            ctx.set_current(msg.metadata.sender, msg.metadata.reply_to);
            let result = b.receive(&mut ctx, msg);
            (result, ctx.take_ops())
        };
        let elapsed_ns = started.elapsed().as_nanos() as u64;

        if let Some(next) = ops.next_behavior {
            if let Some(slot) = behavior.as_mut() {
                *slot = next;
            }
        }

        match result {
            Ok(()) => self.stats.record_processed(elapsed_ns),
            Err(reason) => {
                self.stats.record_failure();
                let strategy = behavior
                    .as_ref()
                    .map_or(SupervisorStrategy::Stop, |b| b.supervisor_strategy());
                self.apply_strategy(this, behavior, shared, strategy, reason);
            }
        }

        if ops.stop_requested {
            self.do_stop(this, behavior, shared, true);
        }
    }

    fn apply_strategy(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
        strategy: SupervisorStrategy,
        reason: BehaviorError,
    ) {
        match strategy {
            SupervisorStrategy::Resume => {
                debug!(actor = %self.path, %reason, "failure resumed");
            }
            SupervisorStrategy::Stop => {
                warn!(actor = %self.path, %reason, "failure stops actor");
                self.do_stop(this, behavior, shared, true);
            }
            SupervisorStrategy::Restart => {
                self.do_restart(this, behavior, shared, reason);
            }
            SupervisorStrategy::Escalate => {
                // The actor keeps processing while the parent decides; the
                // parent answers with Stop / Restart system messages.
                match self.parent.and_then(|id| shared.resolve_id(id)) {
                    Some(parent) => {
                        warn!(actor = %self.path, %reason, "failure escalated");
                        let _ = parent.send_system(SystemTag::Failed(self.id));
                    }
                    None => {
                        error!(actor = %self.path, %reason, "escalation reached the root; stopping");
                        self.do_stop(this, behavior, shared, true);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // System messages
    // ------------------------------------------------------------------

    fn drain_system(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
    ) {
        // Stage first so a restart triggered mid-drain does not observe
        // system messages that arrived after the drain began.
        let mut staged = Vec::new();
        {
            let mut rx = self.system_rx.lock();
            while let Some(msg) = rx.pop() {
                staged.push(msg);
            }
        }
        for msg in staged {
            let Some(tag) = msg.system_tag() else { continue };
            self.handle_system(this, behavior, shared, tag, msg);
        }
    }

    fn handle_system(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
        tag: SystemTag,
        msg: Message,
    ) {
        match tag {
            SystemTag::Start => self.handle_start(this, behavior, shared),
            SystemTag::Stop | SystemTag::Exit => self.do_stop(this, behavior, shared, true),
            SystemTag::Kill => self.do_stop(this, behavior, shared, false),
            SystemTag::Restart => {
                self.do_restart(this, behavior, shared, BehaviorError::new("restart requested"));
            }
            SystemTag::Ping => {
                if let Some(sender) = msg.metadata.sender.and_then(|id| shared.resolve_id(id)) {
                    if let Some(cell) = sender.upgrade() {
                        let pong = Message::system(SystemTag::Pong).with_sender(self.id);
                        let _ = cell.send_system_msg(pong);
                    }
                }
            }
            SystemTag::Watch(watcher) => {
                shared.register_watcher(watcher, self.id);
            }
            SystemTag::Unwatch(watcher) => {
                shared.unwatch(watcher, self.id);
            }
            SystemTag::Terminated(dead) => {
                self.remove_child(dead);
                // Watchers observe terminations through `receive`.
                self.forward_to_behavior(this, behavior, shared, msg);
            }
            SystemTag::Pong | SystemTag::Heartbeat => {
                self.forward_to_behavior(this, behavior, shared, msg);
            }
            SystemTag::Failed(failed) => self.supervise_descendant(behavior, shared, failed),
        }
    }

    fn handle_start(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
    ) {
        if self.state.current() != ActorState::Created {
            return;
        }
        if self.state.transition_to(ActorState::Starting).is_err() {
            return;
        }
        if let Some(b) = behavior.as_mut() {
            let mut ctx = ActorContext::new(this, shared);
            if let Err(err) = b.pre_start(&mut ctx) {
                // Tolerated: there is nothing meaningful to retry.
                warn!(actor = %self.path, %err, "pre_start failed");
            }
        }
        if self.state.transition_to(ActorState::Running).is_ok() {
            trace!(actor = %self.path, "actor running");
        }
    }

    /// A descendant escalated; this actor's strategy decides its fate.
    fn supervise_descendant(
        &self,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
        failed: ActorId,
    ) {
        let strategy = behavior
            .as_ref()
            .map_or(SupervisorStrategy::Stop, |b| b.supervisor_strategy());
        let Some(failed_ref) = shared.resolve_id(failed) else {
            return;
        };
        match strategy {
            SupervisorStrategy::Stop => {
                warn!(supervisor = %self.path, failed = %failed_ref.path(), "stopping failed descendant");
                let _ = failed_ref.send_system(SystemTag::Stop);
            }
            SupervisorStrategy::Restart => {
                debug!(supervisor = %self.path, failed = %failed_ref.path(), "restarting failed descendant");
                let _ = failed_ref.send_system(SystemTag::Restart);
            }
            SupervisorStrategy::Resume => {
                debug!(supervisor = %self.path, failed = %failed_ref.path(), "resuming failed descendant");
            }
            SupervisorStrategy::Escalate => match self.parent.and_then(|id| shared.resolve_id(id)) {
                Some(parent) => {
                    let _ = parent.send_system(SystemTag::Failed(failed));
                }
                None => {
                    error!(failed = %failed_ref.path(), "escalation reached the root; stopping subtree");
                    let _ = failed_ref.send_system(SystemTag::Stop);
                }
            },
        }
    }

    fn forward_to_behavior(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
        msg: Message,
    ) {
        let (result, ops) = {
            let Some(b) = behavior.as_mut() else { return };
            let mut ctx = ActorContext::new(this, shared);
            ctx.set_current(msg.metadata.sender, msg.metadata.reply_to);
            let result = b.receive(&mut ctx, msg);
            (result, ctx.take_ops())
        };
        if let Some(next) = ops.next_behavior {
            if let Some(slot) = behavior.as_mut() {
                *slot = next;
            }
        }
        if let Err(err) = result {
            // System notifications are runtime traffic; a failing handler
            // is logged rather than supervised.
            self.stats.record_failure();
            debug!(actor = %self.path, %err, "failure handling system notification");
        }
        if ops.stop_requested {
            self.do_stop(this, behavior, shared, true);
        }
    }

    // ------------------------------------------------------------------
    // Stop & restart
    // ------------------------------------------------------------------

    /// Graceful (`drain = true`) or immediate stop. Idempotent: repeated
    /// stops of a stopping/stopped actor are no-ops.
    fn do_stop(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
        drain: bool,
    ) {
        if self.state.transition_to(ActorState::Stopping).is_err() {
            // Never-started actors tear down directly.
            if self.state.current() == ActorState::Created
                && self.state.transition_to(ActorState::Terminated).is_ok()
            {
                self.mailbox.clear();
                self.system_rx.lock().clear();
                shared.finalize_actor(this);
            }
            return;
        }

        // Children first, same mode.
        for child in self.child_ids() {
            if let Some(child_ref) = shared.resolve_id(child) {
                let tag = if drain { SystemTag::Stop } else { SystemTag::Kill };
                let _ = child_ref.send_system(tag);
            }
        }

        if drain && self.drain_on_stop {
            let mut drained = 0usize;
            let mut ctx = ActorContext::new(this, shared);
            while let Some(msg) = self.mailbox.try_recv() {
                if !matches!(msg.kind, MessageKind::System(_)) {
                    if let Some(b) = behavior.as_mut() {
                        ctx.set_current(msg.metadata.sender, msg.metadata.reply_to);
                        let started = std::time::Instant::now();
                        match b.receive(&mut ctx, msg) {
                            Ok(()) => self
                                .stats
                                .record_processed(started.elapsed().as_nanos() as u64),
                            Err(err) => {
                                // No supervision during drain.
                                self.stats.record_failure();
                                debug!(actor = %self.path, %err, "failure while draining");
                            }
                        }
                    }
                }
                drained += 1;
            }
            if drained > 0 {
                trace!(actor = %self.path, drained, "drained before stop");
            }
        } else {
            let dropped = self.mailbox.clear();
            if dropped > 0 {
                trace!(actor = %self.path, dropped, "dropped pending messages");
            }
        }

        if let Some(b) = behavior.as_mut() {
            let mut ctx = ActorContext::new(this, shared);
            if let Err(err) = b.post_stop(&mut ctx) {
                warn!(actor = %self.path, %err, "post_stop failed");
            }
        }
        *behavior = None;
        self.dock.lock().stash.clear();
        self.system_rx.lock().clear();

        let _ = self.state.transition_to(ActorState::Stopped);
        shared.finalize_actor(this);
        debug!(actor = %self.path, "actor stopped");
    }

    /// Supervised restart: rebuild the behavior from the factory inside the
    /// restart budget; past the budget the actor fails and stops.
    fn do_restart(
        &self,
        this: &Arc<ActorCell>,
        behavior: &mut Option<BoxBehavior>,
        shared: &Arc<SystemShared>,
        reason: BehaviorError,
    ) {
        let budget = self
            .dock
            .lock()
            .restart_window
            .note_restart(&self.restart_policy);

        let attempt = match budget {
            Ok(n) => n,
            Err(err) => {
                warn!(actor = %self.path, %err, "restart budget exhausted");
                if self.state.transition_to(ActorState::Failed).is_ok() {
                    if let Some(parent) = self.parent.and_then(|id| shared.resolve_id(id)) {
                        let _ = parent.send_system(SystemTag::Failed(self.id));
                    }
                }
                // Budget exhaustion empties the mailbox rather than
                // draining it: the behavior is known-broken.
                self.do_stop(this, behavior, shared, false);
                return;
            }
        };

        if self.state.transition_to(ActorState::Restarting).is_err() {
            return;
        }

        {
            let mut ctx = ActorContext::new(this, shared);
            if let Some(old) = behavior.as_mut() {
                old.pre_restart(&mut ctx, &reason);
            }
        }

        // Restart discards in-flight state: mailbox, stash, counters.
        let dropped = self.mailbox.clear();
        self.dock.lock().stash.clear();
        self.stats.reset_message_counters();
        self.stats.record_restart();

        let mut fresh = (self.factory)();
        if self.state.transition_to(ActorState::Starting).is_err() {
            return;
        }
        {
            let mut ctx = ActorContext::new(this, shared);
            fresh.post_restart(&mut ctx);
        }
        *behavior = Some(fresh);
        let _ = self.state.transition_to(ActorState::Running);
        debug!(actor = %self.path, attempt, dropped, %reason, "actor restarted");
    }
}

impl std::fmt::Debug for ActorCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorCell")
            .field("id", &self.id)
            .field("path", &self.path.as_str())
            .field("state", &self.state.current())
            .finish()
    }
}

/// The canonical scheduler task: process one batch for one actor.
struct MessageTask {
    cell: Arc<ActorCell>,
}

impl Runnable for MessageTask {
    fn run(&self) {
        self.cell.process();
    }

    fn name(&self) -> &str {
        self.cell.path.as_str()
    }
}

/// Expose the ref constructor to the system module.
pub(crate) fn ref_for(cell: &Arc<ActorCell>) -> ActorRef {
    ActorRef::from_cell(cell)
}
