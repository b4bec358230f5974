//! Supervision demo: a flaky worker is restarted inside its budget, then
//! stopped once the budget runs out; a watcher observes the termination.
//!
//! Run with: `cargo run --example supervision`

use std::time::Duration;

use strand_rt::prelude::*;

struct Flaky {
    handled: u32,
}

impl Behavior for Flaky {
    fn receive(&mut self, _ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        self.handled += 1;
        if self.handled % 3 == 0 {
            return Err(BehaviorError::new("flaked out"));
        }
        println!("worker handled {:?}", msg.payload.as_str());
        Ok(())
    }

    fn post_restart(&mut self, ctx: &mut ActorContext<'_>) {
        println!("worker restarted at {}", ctx.path());
    }
}

struct Obituary {
    target: ActorRef,
}

impl Behavior for Obituary {
    fn pre_start(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), BehaviorError> {
        ctx.watch(&self.target);
        Ok(())
    }

    fn receive(&mut self, _ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        if let MessageKind::System(SystemTag::Terminated(dead)) = msg.kind {
            println!("watched actor {dead} terminated");
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SystemConfig::builder()
        .with_worker_threads(2)
        .with_max_restarts(2)
        .with_restart_window(Duration::from_secs(60))
        .build()
        .map_err(SystemError::ConfigError)?;
    let system = ActorSystem::new("supervision-demo", config)?;
    system.start()?;

    let worker = system.spawn(behavior_factory(|| Flaky { handled: 0 }), Some("worker"))?;
    let w = worker.clone();
    system.spawn(
        behavior_factory(move || Obituary { target: w.clone() }),
        Some("obituary"),
    )?;

    for n in 0..12 {
        if let Err(err) = worker.send(Payload::Int(n)) {
            println!("send {n} rejected: {err}");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    system.shutdown()?;
    Ok(())
}
