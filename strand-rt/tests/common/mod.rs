//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use strand_rt::prelude::*;
use strand_rt::system::SystemConfig;

/// A small system suitable for tests.
pub fn test_system(name: &str, workers: usize) -> ActorSystem {
    let config = SystemConfig::builder()
        .with_worker_threads(workers)
        .with_mailbox_capacity(4096)
        .with_idle_sleep(Duration::from_micros(200))
        .with_shutdown_timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let system = ActorSystem::new(name, config).unwrap();
    system.start().unwrap();
    system
}

/// Spin until `cond` holds or `timeout` elapses; returns whether it held.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Records every byte payload it receives.
pub struct Probe {
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    count: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> (Arc<Mutex<Vec<Vec<u8>>>>, Arc<AtomicUsize>, BehaviorFactory) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let count = Arc::new(AtomicUsize::new(0));
        let (r, c) = (Arc::clone(&received), Arc::clone(&count));
        let factory = behavior_factory(move || Probe {
            received: Arc::clone(&r),
            count: Arc::clone(&c),
        });
        (received, count, factory)
    }
}

impl Behavior for Probe {
    fn receive(&mut self, _ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        if let Some(bytes) = msg.payload.as_bytes() {
            self.received.lock().unwrap().push(bytes.to_vec());
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
