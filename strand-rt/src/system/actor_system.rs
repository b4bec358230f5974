//! The actor system: registry, guardians, watchers, lifecycle.

// Layer 1: Standard library
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party
use dashmap::DashMap;
use tracing::{debug, info, warn};

// Layer 3: Internal
use super::config::SystemConfig;
use super::errors::SystemError;
use super::guardian::GuardianBehavior;
use super::registry::Registry;
use super::selection::ActorSelection;
use crate::actor::cell::{ref_for, ActorCell};
use crate::actor::{behavior_factory, ActorRef, BehaviorFactory};
use crate::mailbox::MailboxVariant;
use crate::message::{Message, SystemTag};
use crate::scheduler::{Scheduler, WorkerStats};
use crate::util::{ActorId, ActorPath};

/// System lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemState {
    /// Constructed; scheduler not yet running.
    Starting = 0,
    /// Accepting spawns and delivering messages.
    Running = 1,
    /// Graceful shutdown in progress.
    Terminating = 2,
    /// Shut down. Final.
    Terminated = 3,
}

impl SystemState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Terminating,
            3 => Self::Terminated,
            _ => Self::Starting,
        }
    }
}

pub(crate) struct GuardianRefs {
    pub(crate) root: ActorRef,
    pub(crate) user: ActorRef,
    pub(crate) system: ActorRef,
}

/// Shared interior of an [`ActorSystem`]; every handle and cell points
/// here. Two independent systems never share any of this state.
pub(crate) struct SystemShared {
    pub(crate) name: String,
    pub(crate) config: SystemConfig,
    pub(crate) scheduler: Scheduler,
    pub(crate) registry: Registry,
    /// watched id → ids of its watchers.
    watchers: DashMap<ActorId, HashSet<ActorId>>,
    state: AtomicU8,
    next_actor_id: AtomicU64,
    anon_counter: AtomicU64,
    user_actor_count: AtomicUsize,
    guardians: parking_lot::RwLock<Option<GuardianRefs>>,
    /// Back-reference handed to every cell (cells hold the system weakly).
    self_ref: std::sync::Weak<SystemShared>,
}

impl SystemShared {
    pub(crate) fn state(&self) -> SystemState {
        // Acquire pairs with the Release transitions below.
        SystemState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_past_terminating(&self) -> bool {
        self.state() == SystemState::Terminated
    }

    fn next_actor_id(&self) -> ActorId {
        // Relaxed: uniqueness only.
        ActorId::from_raw(self.next_actor_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn resolve_id(&self, id: ActorId) -> Option<ActorRef> {
        self.registry.by_id(id).map(|cell| ref_for(&cell))
    }

    pub(crate) fn user_actor_count(&self) -> usize {
        self.user_actor_count.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Watchers
    // ------------------------------------------------------------------

    /// Register `watcher` for `target`'s termination; an already-terminal
    /// target produces the notification immediately.
    pub(crate) fn watch(&self, watcher: ActorId, target: &ActorRef) {
        match target.upgrade() {
            Some(cell) if !cell.state().is_terminal() => {
                self.watchers
                    .entry(target.id())
                    .or_default()
                    .insert(watcher);
                // Termination may have raced the insert; claim the entry
                // back if finalize already swept past it.
                if cell.state().is_terminal() {
                    let claimed = self
                        .watchers
                        .get_mut(&target.id())
                        .map(|mut entry| entry.remove(&watcher))
                        .unwrap_or(false);
                    if claimed {
                        self.deliver_terminated(watcher, target.id());
                    }
                }
            }
            _ => self.deliver_terminated(watcher, target.id()),
        }
    }

    /// Watch registration by id (the `Watch` system-message path).
    pub(crate) fn register_watcher(&self, watcher: ActorId, watched: ActorId) {
        match self.resolve_id(watched) {
            Some(target) => self.watch(watcher, &target),
            None => self.deliver_terminated(watcher, watched),
        }
    }

    pub(crate) fn unwatch(&self, watcher: ActorId, watched: ActorId) {
        if let Some(mut entry) = self.watchers.get_mut(&watched) {
            entry.remove(&watcher);
        }
    }

    fn deliver_terminated(&self, watcher: ActorId, dead: ActorId) {
        if let Some(cell) = self.registry.by_id(watcher) {
            let msg = Message::system(SystemTag::Terminated(dead)).with_sender(dead);
            let _ = cell.send_system_msg(msg);
        }
    }

    // ------------------------------------------------------------------
    // Spawn / teardown
    // ------------------------------------------------------------------

    /// Build, register, link, and start a cell. `parent = None` targets
    /// the `/user` guardian.
    pub(crate) fn spawn_cell(
        &self,
        parent: Option<&Arc<ActorCell>>,
        factory: BehaviorFactory,
        name: Option<String>,
        variant: Option<MailboxVariant>,
        mailbox_capacity: Option<usize>,
    ) -> Result<ActorRef, SystemError> {
        match self.state() {
            SystemState::Starting | SystemState::Running => {}
            _ => return Err(SystemError::SystemShutdown),
        }

        let parent_cell = match parent {
            Some(cell) => Arc::clone(cell),
            None => {
                let guardians = self.guardians.read();
                let user = guardians
                    .as_ref()
                    .map(|g| g.user.clone())
                    .ok_or(SystemError::SystemShutdown)?;
                drop(guardians);
                user.upgrade().ok_or(SystemError::SystemShutdown)?
            }
        };

        let name = match name {
            Some(given) => given,
            None => format!("$anon-{}", self.anon_counter.fetch_add(1, Ordering::Relaxed)),
        };
        let path = parent_cell
            .path()
            .child(&name)
            .ok_or_else(|| SystemError::InvalidName(name.clone()))?;

        let cell = ActorCell::new(
            self.next_actor_id(),
            path,
            Some(parent_cell.id()),
            factory,
            variant.unwrap_or(self.config.mailbox_variant),
            mailbox_capacity.unwrap_or(self.config.mailbox_capacity),
            self.config.system_queue_capacity,
            self.config.batch_size.min(super::config::MAX_BATCH_SIZE),
            self.config.drain_on_stop,
            self.config.restart_policy(),
            self.self_ref.clone(),
        );

        self.registry.insert(&cell)?;
        parent_cell.add_child(cell.id());
        if cell.path().is_user() {
            self.user_actor_count.fetch_add(1, Ordering::AcqRel);
        }

        let actor_ref = ref_for(&cell);
        let _ = cell.send_system_msg(Message::system(SystemTag::Start));
        debug!(actor = %actor_ref.path(), id = %actor_ref.id(), "actor spawned");
        Ok(actor_ref)
    }

    /// Deregister a stopped cell: registry, watcher table, parent link,
    /// user count, watcher notifications. Called exactly once per actor,
    /// from its own (serialized) processing task.
    pub(crate) fn finalize_actor(&self, cell: &Arc<ActorCell>) {
        self.registry.remove(cell);

        if let Some((_, watchers)) = self.watchers.remove(&cell.id()) {
            for watcher in watchers {
                self.deliver_terminated(watcher, cell.id());
            }
        }
        // Registrations made *by* this actor die with it.
        for mut entry in self.watchers.iter_mut() {
            entry.value_mut().remove(&cell.id());
        }

        if let Some(parent) = cell.parent_id().and_then(|id| self.registry.by_id(id)) {
            parent.remove_child(cell.id());
        }

        if cell.path().is_user() {
            self.user_actor_count.fetch_sub(1, Ordering::AcqRel);
        }

        // Created-path teardown already sits at Terminated; the normal
        // path arrives here as Stopped and transitions now.
        cell.mark_terminated();
    }
}

/// A high-throughput, in-process actor system.
///
/// Owns a work-stealing scheduler, the actor registry, and the three root
/// guardians `/`, `/user`, `/system`. Cheap to clone; all clones share
/// the same system. Independent instances share nothing.
///
/// # Example
/// ```rust,no_run
/// use strand_rt::prelude::*;
///
/// struct Echo;
/// impl Behavior for Echo {
///     fn receive(&mut self, ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
///         if let Some(text) = msg.payload.as_str() {
///             println!("echo: {text}");
///         }
///         Ok(())
///     }
/// }
///
/// let system = ActorSystem::new("demo", SystemConfig::default()).unwrap();
/// system.start().unwrap();
/// let echo = system.spawn(behavior_factory(|| Echo), Some("echo")).unwrap();
/// echo.send(Payload::bytes(b"hello")).unwrap();
/// system.shutdown().unwrap();
/// ```
#[derive(Clone)]
pub struct ActorSystem {
    shared: Arc<SystemShared>,
}

impl ActorSystem {
    /// Build a system. The scheduler is not running yet; call
    /// [`ActorSystem::start`].
    pub fn new(name: impl Into<String>, config: SystemConfig) -> Result<Self, SystemError> {
        config.validate().map_err(SystemError::ConfigError)?;

        let name = name.into();
        let shared = Arc::new_cyclic(|self_ref| SystemShared {
            name,
            scheduler: Scheduler::new(config.scheduler_config()),
            config,
            registry: Registry::new(),
            watchers: DashMap::new(),
            state: AtomicU8::new(SystemState::Starting as u8),
            next_actor_id: AtomicU64::new(1),
            anon_counter: AtomicU64::new(0),
            user_actor_count: AtomicUsize::new(0),
            guardians: parking_lot::RwLock::new(None),
            self_ref: self_ref.clone(),
        });

        let system = Self { shared };
        system.create_guardians()?;
        Ok(system)
    }

    pub(crate) fn from_shared(shared: Arc<SystemShared>) -> Self {
        Self { shared }
    }

    fn create_guardians(&self) -> Result<(), SystemError> {
        let shared = &self.shared;

        let root = ActorCell::new(
            shared.next_actor_id(),
            ActorPath::root(),
            None,
            behavior_factory(GuardianBehavior::root),
            MailboxVariant::Fast,
            shared.config.system_queue_capacity,
            shared.config.system_queue_capacity,
            shared.config.batch_size,
            true,
            shared.config.restart_policy(),
            shared.self_ref.clone(),
        );
        shared.registry.insert(&root)?;

        let user = shared.spawn_guardian_child(&root, ActorPath::user(), GuardianBehavior::user)?;
        let sys = shared.spawn_guardian_child(&root, ActorPath::system(), GuardianBehavior::system)?;

        let refs = GuardianRefs {
            root: ref_for(&root),
            user,
            system: sys,
        };
        let _ = root.send_system_msg(Message::system(SystemTag::Start));
        *shared.guardians.write() = Some(refs);
        Ok(())
    }

    /// The system's name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The configuration this system runs with.
    pub fn config(&self) -> &SystemConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SystemState {
        self.shared.state()
    }

    /// Start the scheduler and deliver the pending `Start` messages.
    /// Idempotent while running.
    pub fn start(&self) -> Result<(), SystemError> {
        if self.shared.state() == SystemState::Running {
            return Ok(());
        }
        self.shared.scheduler.start()?;
        if self
            .shared
            .state
            .compare_exchange(
                SystemState::Starting as u8,
                SystemState::Running as u8,
                // AcqRel: publishes guardian/spawn work to observers of
                // Running.
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(SystemError::SystemShutdown);
        }

        // Actors spawned before start have queued work but no task.
        self.shared.registry.for_each(|cell| cell.rewake());
        info!(system = %self.shared.name, workers = self.shared.scheduler.worker_count(), "actor system running");
        Ok(())
    }

    /// Spawn a user actor under `/user`. With `None`, a unique name is
    /// generated.
    pub fn spawn(
        &self,
        factory: BehaviorFactory,
        name: Option<&str>,
    ) -> Result<ActorRef, SystemError> {
        self.shared
            .spawn_cell(None, factory, name.map(str::to_owned), None, None)
    }

    /// Fluent spawn with per-actor overrides.
    pub fn spawn_builder(&self, factory: BehaviorFactory) -> super::builder::SpawnBuilder<'_> {
        super::builder::SpawnBuilder::new(self, factory)
    }

    pub(crate) fn shared(&self) -> &Arc<SystemShared> {
        &self.shared
    }

    /// Ask an actor to stop gracefully.
    pub fn stop_actor(&self, actor: &ActorRef) -> Result<(), SystemError> {
        let cell = self
            .shared
            .registry
            .by_id(actor.id())
            .ok_or_else(|| SystemError::ActorNotFound(actor.path().as_str().to_owned()))?;
        cell.send_system_msg(Message::system(SystemTag::Stop))
            .map_err(|_| SystemError::ActorNotFound(actor.path().as_str().to_owned()))
    }

    /// Exact-path lookup.
    pub fn find(&self, path: &str) -> Option<ActorRef> {
        self.shared.registry.by_path(path).map(|cell| ref_for(&cell))
    }

    /// Lazy selection; see [`ActorSelection`] for the pattern syntax.
    pub fn selection(&self, pattern: &str) -> ActorSelection {
        ActorSelection::new(&self.shared, pattern)
    }

    /// Live actors under `/user`.
    pub fn user_actor_count(&self) -> usize {
        self.shared.user_actor_count()
    }

    /// All registered actors, guardians included.
    pub fn actor_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Per-worker scheduler counters.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.shared.scheduler.worker_stats()
    }

    /// Graceful shutdown: stop `/user`, wait for the user subtree to
    /// drain (bounded by the shutdown timeout), stop `/system` and the
    /// root, then stop the scheduler. Idempotent.
    pub fn shutdown(&self) -> Result<(), SystemError> {
        if self
            .shared
            .state
            .compare_exchange(
                SystemState::Running as u8,
                SystemState::Terminating as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            match self.shared.state() {
                // Second call, or never started: make both terminal.
                SystemState::Terminating | SystemState::Terminated => return Ok(()),
                SystemState::Starting => {
                    self.shared
                        .state
                        .store(SystemState::Terminated as u8, Ordering::Release);
                    return Ok(());
                }
                SystemState::Running => return Err(SystemError::SystemShutdown),
            }
        }

        info!(system = %self.shared.name, "actor system terminating");
        let deadline = Instant::now() + self.shared.config.shutdown_timeout;

        let guardians = self.shared.guardians.read();
        if let Some(refs) = guardians.as_ref() {
            let _ = refs.user.send_system(SystemTag::Stop);
        }
        drop(guardians);

        while self.shared.user_actor_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        let leftover = self.shared.user_actor_count();
        if leftover > 0 {
            warn!(leftover, "user actors still alive at shutdown deadline");
        }

        let guardians = self.shared.guardians.read();
        if let Some(refs) = guardians.as_ref() {
            let _ = refs.system.send_system(SystemTag::Stop);
            let _ = refs.root.send_system(SystemTag::Stop);
        }
        drop(guardians);

        while self.shared.registry.len() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }

        let scheduler_result = self.shared.scheduler.stop();
        self.shared
            .state
            .store(SystemState::Terminated as u8, Ordering::Release);
        info!(system = %self.shared.name, "actor system terminated");

        scheduler_result.map_err(SystemError::from)
    }
}

impl SystemShared {
    fn spawn_guardian_child(
        &self,
        root: &Arc<ActorCell>,
        path: ActorPath,
        behavior: fn() -> GuardianBehavior,
    ) -> Result<ActorRef, SystemError> {
        let cell = ActorCell::new(
            self.next_actor_id(),
            path,
            Some(root.id()),
            behavior_factory(behavior),
            MailboxVariant::Fast,
            self.config.system_queue_capacity,
            self.config.system_queue_capacity,
            self.config.batch_size,
            true,
            self.config.restart_policy(),
            self.self_ref.clone(),
        );
        self.registry.insert(&cell)?;
        root.add_child(cell.id());
        let actor_ref = ref_for(&cell);
        let _ = cell.send_system_msg(Message::system(SystemTag::Start));
        Ok(actor_ref)
    }
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSystem")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("actors", &self.actor_count())
            .finish()
    }
}
