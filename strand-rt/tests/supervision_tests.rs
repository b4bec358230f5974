//! Supervision: restart budgets, watchers, escalation, stashing.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{test_system, wait_until};
use strand_rt::prelude::*;
use strand_rt::system::SystemConfig;

/// Fails on every 5th message of the actor's *lifetime*. The schedule
/// lives in counters shared across restarts (a rebuilt instance inherits
/// them), modeling corruption in state outside the behavior itself: once
/// three failures have accrued, every further message fails too, so a
/// restart can never clear the fault.
struct FlakyEveryFifth {
    received: Arc<AtomicU32>,
    ok: Arc<AtomicU32>,
    failed: Arc<AtomicU32>,
}

impl Behavior for FlakyEveryFifth {
    fn receive(&mut self, _ctx: &mut ActorContext<'_>, _msg: Message) -> Result<(), BehaviorError> {
        let n = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 5 == 0 || self.failed.load(Ordering::SeqCst) >= 3 {
            self.failed.fetch_add(1, Ordering::SeqCst);
            Err(BehaviorError::new("scheduled failure"))
        } else {
            self.ok.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

struct TerminationWatcher {
    target: ActorRef,
    notifications: Arc<AtomicU32>,
}

impl Behavior for TerminationWatcher {
    fn pre_start(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        ctx.watch(&self.target);
        Ok(())
    }

    fn receive(&mut self, _ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        if let MessageKind::System(SystemTag::Terminated(dead)) = msg.kind {
            if dead == self.target.id() {
                self.notifications.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

#[test]
fn restart_budget_exhaustion_stops_the_actor() {
    let system = test_system("restarts", 2);

    let received = Arc::new(AtomicU32::new(0));
    let ok = Arc::new(AtomicU32::new(0));
    let failed = Arc::new(AtomicU32::new(0));
    let (r, o, f) = (
        Arc::clone(&received),
        Arc::clone(&ok),
        Arc::clone(&failed),
    );
    let flaky = system
        .spawn(
            behavior_factory(move || FlakyEveryFifth {
                received: Arc::clone(&r),
                ok: Arc::clone(&o),
                failed: Arc::clone(&f),
            }),
            Some("flaky"),
        )
        .unwrap();

    let notifications = Arc::new(AtomicU32::new(0));
    let (t, n) = (flaky.clone(), Arc::clone(&notifications));
    let _watcher = system
        .spawn(
            behavior_factory(move || TerminationWatcher {
                target: t.clone(),
                notifications: Arc::clone(&n),
            }),
            Some("watcher"),
        )
        .unwrap();

    // Paced sends: each message is fully handled before the next goes
    // out, so restarts (which clear the mailbox) never discard backlog.
    for i in 1..=16u32 {
        flaky.send(Payload::Int(i as i64)).unwrap();
        assert!(
            wait_until(Duration::from_secs(5), || {
                ok.load(Ordering::SeqCst) + failed.load(Ordering::SeqCst) >= i
            }),
            "message {i} was never handled"
        );
    }

    // Messages 1-4, 6-9, and 11-14 are handled; the failures at 5, 10
    // and 15 each restart within the budget of 3, and the fourth failure
    // at message 16 exceeds it, stopping the actor for good.
    assert!(wait_until(Duration::from_secs(5), || flaky.is_terminated()));
    assert_eq!(ok.load(Ordering::SeqCst), 12);
    assert_eq!(failed.load(Ordering::SeqCst), 4);
    assert_eq!(
        flaky.send(Payload::Int(0)),
        Err(SendError::ActorTerminated(flaky.id()))
    );

    // The watcher hears about it exactly once.
    assert!(wait_until(Duration::from_secs(5), || {
        notifications.load(Ordering::SeqCst) >= 1
    }));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(notifications.load(Ordering::SeqCst), 1);

    system.shutdown().unwrap();
}

#[test]
fn restart_hooks_run_in_order() {
    let system = test_system("hooks", 2);

    let events = Arc::new(Mutex::new(Vec::<String>::new()));

    struct Hooked {
        events: Arc<Mutex<Vec<String>>>,
    }
    impl Behavior for Hooked {
        fn receive(
            &mut self,
            _ctx: &mut ActorContext<'_>,
            msg: Message,
        ) -> Result<(), BehaviorError> {
            if msg.payload.as_str() == Some("boom") {
                return Err(BehaviorError::new("boom"));
            }
            self.events.lock().unwrap().push("receive".into());
            Ok(())
        }

        fn pre_restart(&mut self, _ctx: &mut ActorContext<'_>, reason: &BehaviorError) {
            self.events
                .lock()
                .unwrap()
                .push(format!("pre_restart:{}", reason.message()));
        }

        fn post_restart(&mut self, _ctx: &mut ActorContext<'_>) {
            self.events.lock().unwrap().push("post_restart".into());
        }
    }

    let e = Arc::clone(&events);
    let actor = system
        .spawn(
            behavior_factory(move || Hooked {
                events: Arc::clone(&e),
            }),
            Some("hooked"),
        )
        .unwrap();

    // Paced: a restart clears the mailbox, so each message must be fully
    // handled before the next is sent.
    actor.send(Payload::from_static(b"ok")).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        events.lock().unwrap().len() >= 1
    }));
    actor.send(Payload::from_static(b"boom")).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        events.lock().unwrap().len() >= 3
    }));
    actor.send(Payload::from_static(b"ok")).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        events.lock().unwrap().len() >= 4
    }));
    let seen = events.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            "receive".to_string(),
            "pre_restart:boom".to_string(),
            "post_restart".to_string(),
            "receive".to_string(),
        ]
    );

    system.shutdown().unwrap();
}

#[test]
fn escalation_reaches_parent_which_stops_the_child() {
    let system = test_system("escalation", 2);

    struct Escalating;
    impl Behavior for Escalating {
        fn receive(
            &mut self,
            _ctx: &mut ActorContext<'_>,
            msg: Message,
        ) -> Result<(), BehaviorError> {
            if msg.payload.as_str() == Some("boom") {
                return Err(BehaviorError::new("escalating"));
            }
            Ok(())
        }

        fn supervisor_strategy(&self) -> SupervisorStrategy {
            SupervisorStrategy::Escalate
        }
    }

    struct StoppingParent;
    impl Behavior for StoppingParent {
        fn pre_start(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
            ctx.spawn_child(behavior_factory(|| Escalating), Some("child"))
                .map_err(|e| BehaviorError::new(e.to_string()))?;
            Ok(())
        }

        fn supervisor_strategy(&self) -> SupervisorStrategy {
            SupervisorStrategy::Stop
        }
    }

    let _parent = system
        .spawn(behavior_factory(|| StoppingParent), Some("parent"))
        .unwrap();

    let child = {
        assert!(wait_until(Duration::from_secs(5), || {
            system.find("/user/parent/child").is_some()
        }));
        system.find("/user/parent/child").unwrap()
    };

    child.send(Payload::from_static(b"boom")).unwrap();

    // The parent's Stop strategy takes the escalated child down.
    assert!(wait_until(Duration::from_secs(5), || child.is_terminated()));
    assert!(system.find("/user/parent/child").is_none());

    system.shutdown().unwrap();
}

#[test]
fn resume_strategy_keeps_processing() {
    let system = test_system("resume", 2);

    let ok = Arc::new(AtomicU32::new(0));

    struct Resuming {
        ok: Arc<AtomicU32>,
    }
    impl Behavior for Resuming {
        fn receive(
            &mut self,
            _ctx: &mut ActorContext<'_>,
            msg: Message,
        ) -> Result<(), BehaviorError> {
            if msg.payload.as_str() == Some("fail") {
                return Err(BehaviorError::new("ignored"));
            }
            self.ok.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn supervisor_strategy(&self) -> SupervisorStrategy {
            SupervisorStrategy::Resume
        }
    }

    let o = Arc::clone(&ok);
    let actor = system
        .spawn(
            behavior_factory(move || Resuming {
                ok: Arc::clone(&o),
            }),
            Some("resuming"),
        )
        .unwrap();

    actor.send(Payload::from_static(b"a")).unwrap();
    actor.send(Payload::from_static(b"fail")).unwrap();
    actor.send(Payload::from_static(b"b")).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        ok.load(Ordering::SeqCst) == 2
    }));
    assert!(!actor.is_terminated());
    assert_eq!(actor.stats().unwrap().failed, 1);

    system.shutdown().unwrap();
}

#[test]
fn stash_replays_in_order_after_become() {
    let system = test_system("stash", 2);

    let order = Arc::new(Mutex::new(Vec::<i64>::new()));

    struct Active {
        order: Arc<Mutex<Vec<i64>>>,
    }
    impl Behavior for Active {
        fn receive(
            &mut self,
            _ctx: &mut ActorContext<'_>,
            msg: Message,
        ) -> Result<(), BehaviorError> {
            if let Payload::Int(n) = msg.payload {
                self.order.lock().unwrap().push(n);
            }
            Ok(())
        }
    }

    struct Gated {
        order: Arc<Mutex<Vec<i64>>>,
    }
    impl Behavior for Gated {
        fn receive(
            &mut self,
            ctx: &mut ActorContext<'_>,
            msg: Message,
        ) -> Result<(), BehaviorError> {
            match msg.payload.as_str() {
                Some("open") => {
                    ctx.replace_behavior(Active {
                        order: Arc::clone(&self.order),
                    });
                    ctx.unstash_all();
                }
                _ => ctx.stash(msg),
            }
            Ok(())
        }
    }

    let o = Arc::clone(&order);
    let actor = system
        .spawn(
            behavior_factory(move || Gated {
                order: Arc::clone(&o),
            }),
            Some("gated"),
        )
        .unwrap();

    actor.send(Payload::Int(1)).unwrap();
    actor.send(Payload::Int(2)).unwrap();
    actor.send(Payload::Int(3)).unwrap();
    actor.send(Payload::from_static(b"open")).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        order.lock().unwrap().len() == 3
    }));
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);

    system.shutdown().unwrap();
}

#[test]
fn watch_registration_via_system_message() {
    let system = test_system("watch-msg", 2);

    struct CountsTerminated {
        notifications: Arc<AtomicU32>,
    }
    impl Behavior for CountsTerminated {
        fn receive(
            &mut self,
            _ctx: &mut ActorContext<'_>,
            msg: Message,
        ) -> Result<(), BehaviorError> {
            if matches!(msg.kind, MessageKind::System(SystemTag::Terminated(_))) {
                self.notifications.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct Noop;
    impl Behavior for Noop {}

    let notifications = Arc::new(AtomicU32::new(0));
    let n = Arc::clone(&notifications);
    let watcher = system
        .spawn(
            behavior_factory(move || CountsTerminated {
                notifications: Arc::clone(&n),
            }),
            Some("observer"),
        )
        .unwrap();
    let target = system
        .spawn(behavior_factory(|| Noop), Some("observed"))
        .unwrap();

    // Registration through the wire protocol rather than the context.
    target
        .send_msg(Message::system(SystemTag::Watch(watcher.id())))
        .unwrap();
    std::thread::sleep(Duration::from_millis(20));

    system.stop_actor(&target).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        notifications.load(Ordering::SeqCst) == 1
    }));

    system.shutdown().unwrap();
}

#[test]
fn always_failing_actor_respects_configured_budget() {
    let config = SystemConfig::builder()
        .with_worker_threads(2)
        .with_max_restarts(2)
        .with_restart_window(Duration::from_secs(60))
        .with_idle_sleep(Duration::from_micros(200))
        .build()
        .unwrap();
    let system = ActorSystem::new("budget", config).unwrap();
    system.start().unwrap();

    let failures = Arc::new(AtomicU32::new(0));
    let restarts = Arc::new(AtomicU32::new(0));

    struct AlwaysFails {
        failures: Arc<AtomicU32>,
        restarts: Arc<AtomicU32>,
    }
    impl Behavior for AlwaysFails {
        fn receive(
            &mut self,
            _ctx: &mut ActorContext<'_>,
            _msg: Message,
        ) -> Result<(), BehaviorError> {
            self.failures.fetch_add(1, Ordering::SeqCst);
            Err(BehaviorError::new("always"))
        }

        fn post_restart(&mut self, _ctx: &mut ActorContext<'_>) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
    }

    let (f, r) = (Arc::clone(&failures), Arc::clone(&restarts));
    let actor = system
        .spawn(
            behavior_factory(move || AlwaysFails {
                failures: Arc::clone(&f),
                restarts: Arc::clone(&r),
            }),
            Some("doomed"),
        )
        .unwrap();

    for i in 1..=3u32 {
        actor.send(Payload::Int(i as i64)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            failures.load(Ordering::SeqCst) >= i
        }));
    }

    assert!(wait_until(Duration::from_secs(5), || actor.is_terminated()));
    // Two restarts allowed, the third failure goes over budget.
    assert_eq!(restarts.load(Ordering::SeqCst), 2);

    system.shutdown().unwrap();
}
