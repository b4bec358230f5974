//! Minimal counter actor: send increments, ask for the total.
//!
//! Run with: `cargo run --example counter`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strand_rt::prelude::*;

struct Counter {
    count: u32,
}

impl Behavior for Counter {
    fn receive(&mut self, ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        match msg.payload.as_str() {
            Some("inc") => self.count += 1,
            Some("get") => {
                ctx.reply(Payload::bytes(&self.count.to_le_bytes()))
                    .map_err(|e| BehaviorError::new(e.to_string()))?;
            }
            _ => {}
        }
        Ok(())
    }
}

struct Printer {
    done: Arc<AtomicBool>,
}

impl Behavior for Printer {
    fn receive(&mut self, _ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        if let Some(bytes) = msg.payload.as_bytes() {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[..4]);
            println!("count = {}", u32::from_le_bytes(raw));
            self.done.store(true, Ordering::Release);
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let system = ActorSystem::new("counter-demo", SystemConfig::default())?;
    system.start()?;

    let done = Arc::new(AtomicBool::new(false));
    let d = Arc::clone(&done);
    let printer = system.spawn(
        behavior_factory(move || Printer {
            done: Arc::clone(&d),
        }),
        Some("printer"),
    )?;
    let counter = system.spawn(behavior_factory(|| Counter { count: 0 }), Some("counter"))?;

    for _ in 0..1000 {
        counter.send(Payload::from_static(b"inc"))?;
    }
    counter.send_msg(Message::user(Payload::from_static(b"get")).with_reply_to(printer.id()))?;

    while !done.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(1));
    }

    system.shutdown()?;
    Ok(())
}
