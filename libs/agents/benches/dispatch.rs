//! Dispatch cost per receive policy
//!
//! Measures `input` on a single agent and on a two-stage pipeline wired
//! through a system, for each policy.

use agent_graph::{AgentBuilder, Outbox, PolicyKind, Receive, Result, SystemBuilder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const POLICIES: [PolicyKind; 3] = [
    PolicyKind::Synchronous,
    PolicyKind::DedicatedThread,
    PolicyKind::NonReentrant,
];

struct Tick(u64);
struct Forwarded(u64);

#[derive(Default)]
struct Counter {
    total: Arc<AtomicU64>,
}

impl Receive<Tick> for Counter {
    fn receive(&self, msg: Tick, _outbox: &Outbox) -> Result<()> {
        self.total.fetch_add(msg.0, Ordering::Relaxed);
        Ok(())
    }
}

impl Receive<Forwarded> for Counter {
    fn receive(&self, msg: Forwarded, _outbox: &Outbox) -> Result<()> {
        self.total.fetch_add(msg.0, Ordering::Relaxed);
        Ok(())
    }
}

struct Forwarder;

impl Receive<Tick> for Forwarder {
    fn receive(&self, msg: Tick, outbox: &Outbox) -> Result<()> {
        outbox.send(Forwarded(msg.0))
    }
}

fn bench_single_agent(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_agent_input");
    group.throughput(Throughput::Elements(1));

    for policy in POLICIES {
        let agent = AgentBuilder::new("counter", Counter::default(), policy)
            .receives::<Tick>()
            .build();
        agent.start().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(policy), &agent, |b, agent| {
            b.iter(|| agent.input(black_box(Tick(1))).unwrap())
        });

        agent.finish().unwrap();
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_stage_pipeline");
    group.throughput(Throughput::Elements(1));

    for policy in POLICIES {
        let forwarder = AgentBuilder::new("forwarder", Forwarder, policy)
            .receives::<Tick>()
            .sends::<Forwarded>()
            .build();
        let counter = AgentBuilder::new("counter", Counter::default(), policy)
            .receives::<Forwarded>()
            .build();
        let system = SystemBuilder::new("bench")
            .component(forwarder)
            .component(counter)
            .connection::<Forwarded>("forwarder", "counter")
            .input::<Tick>("forwarder")
            .build()
            .unwrap();
        system.start().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(policy), &system, |b, system| {
            b.iter(|| system.input(black_box(Tick(1))).unwrap())
        });

        system.finish().unwrap();
    }
    group.finish();
}

criterion_group!(benches, bench_single_agent, bench_pipeline);
criterion_main!(benches);
