//! Scheduler Benchmarks
//!
//! End-to-end throughput through the full runtime:
//! - one hot actor on a multi-worker pool
//! - many actors fanning work across workers
//! - spawn cost

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

// Layer 3: Internal module imports
use strand_rt::prelude::*;
use strand_rt::system::SystemConfig;

struct Sink {
    handled: Arc<AtomicU64>,
}

impl Behavior for Sink {
    fn receive(&mut self, _ctx: &mut ActorContext<'_>, _msg: Message) -> Result<(), BehaviorError> {
        self.handled.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn bench_system(workers: usize) -> ActorSystem {
    let config = SystemConfig::builder()
        .with_worker_threads(workers)
        .with_mailbox_capacity(8192)
        .with_idle_sleep(Duration::from_micros(100))
        .build()
        .unwrap();
    let system = ActorSystem::new("bench", config).unwrap();
    system.start().unwrap();
    system
}

fn single_hot_actor(c: &mut Criterion) {
    let system = bench_system(4);
    let handled = Arc::new(AtomicU64::new(0));
    let h = Arc::clone(&handled);
    let actor = system
        .spawn_builder(behavior_factory(move || Sink {
            handled: Arc::clone(&h),
        }))
        .with_name("sink")
        .with_mailbox_variant(MailboxVariant::Fast)
        .spawn()
        .unwrap();

    let mut group = c.benchmark_group("single_hot_actor");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("send_10k_and_drain", |b| {
        b.iter(|| {
            let before = handled.load(Ordering::Relaxed);
            for _ in 0..10_000 {
                while actor.send(Payload::Int(1)).is_err() {
                    std::hint::spin_loop();
                }
            }
            while handled.load(Ordering::Relaxed) < before + 10_000 {
                std::hint::spin_loop();
            }
            black_box(handled.load(Ordering::Relaxed))
        });
    });
    group.finish();

    system.shutdown().unwrap();
}

fn fan_out_across_actors(c: &mut Criterion) {
    let system = bench_system(4);
    let handled = Arc::new(AtomicU64::new(0));
    let actors: Vec<ActorRef> = (0..16)
        .map(|i| {
            let h = Arc::clone(&handled);
            system
                .spawn_builder(behavior_factory(move || Sink {
                    handled: Arc::clone(&h),
                }))
                .with_name(format!("sink-{i}"))
                .with_mailbox_variant(MailboxVariant::Fast)
                .spawn()
                .unwrap()
        })
        .collect();

    let mut group = c.benchmark_group("fan_out_16_actors");
    group.throughput(Throughput::Elements(16_000));
    group.bench_function("send_1k_each_and_drain", |b| {
        b.iter(|| {
            let before = handled.load(Ordering::Relaxed);
            for actor in &actors {
                for _ in 0..1000 {
                    while actor.send(Payload::Int(1)).is_err() {
                        std::hint::spin_loop();
                    }
                }
            }
            while handled.load(Ordering::Relaxed) < before + 16_000 {
                std::hint::spin_loop();
            }
            black_box(handled.load(Ordering::Relaxed))
        });
    });
    group.finish();

    system.shutdown().unwrap();
}

fn spawn_cost(c: &mut Criterion) {
    let system = bench_system(2);
    let handled = Arc::new(AtomicU64::new(0));

    c.bench_function("spawn_anonymous_actor", |b| {
        b.iter(|| {
            let h = Arc::clone(&handled);
            let actor = system
                .spawn(
                    behavior_factory(move || Sink {
                        handled: Arc::clone(&h),
                    }),
                    None,
                )
                .unwrap();
            black_box(actor)
        });
    });

    system.shutdown().unwrap();
}

criterion_group!(benches, single_hot_actor, fan_out_across_actors, spawn_cost);
criterion_main!(benches);
