//! Delivery properties that must hold for every receive policy

use agent_graph::{AgentBuilder, Outbox, PolicyKind, Receive, Result};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<u32>>>,
    in_flight: AtomicUsize,
    max_in_flight: Arc<AtomicUsize>,
}

impl Receive<u32> for Recorder {
    fn receive(&self, msg: u32, _outbox: &Outbox) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().push(msg);
        thread::yield_now();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn policy_strategy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![
        Just(PolicyKind::Synchronous),
        Just(PolicyKind::DedicatedThread),
        Just(PolicyKind::NonReentrant),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Messages from one sender are handled in the order they were sent
    #[test]
    fn prop_single_sender_fifo(
        policy in policy_strategy(),
        messages in prop::collection::vec(any::<u32>(), 0..200),
    ) {
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let agent = AgentBuilder::new("recorder", recorder, policy)
            .receives::<u32>()
            .build();

        agent.start().unwrap();
        for &msg in &messages {
            agent.input(msg).unwrap();
        }
        agent.finish().unwrap();

        prop_assert_eq!(&*seen.lock(), &messages);
    }

    /// Concurrent senders: every message handled exactly once, never two
    /// handlers of the same agent at a time
    #[test]
    fn prop_concurrent_exactly_once(
        policy in prop_oneof![Just(PolicyKind::DedicatedThread), Just(PolicyKind::NonReentrant)],
        senders in 1usize..6,
        per_sender in 1u32..60,
    ) {
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let max_in_flight = recorder.max_in_flight.clone();
        let agent = Arc::new(
            AgentBuilder::new("recorder", recorder, policy)
                .receives::<u32>()
                .build(),
        );

        agent.start().unwrap();
        let handles: Vec<_> = (0..senders)
            .map(|s| {
                let agent = agent.clone();
                thread::spawn(move || {
                    for i in 0..per_sender {
                        agent.input(s as u32 * 1000 + i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        agent.finish().unwrap();

        let mut got = seen.lock().clone();
        prop_assert_eq!(got.len(), senders * per_sender as usize);
        prop_assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

        // per-sender order survives interleaving
        for s in 0..senders as u32 {
            let mine: Vec<u32> = got.iter().copied().filter(|m| m / 1000 == s).collect();
            let expected: Vec<u32> = (0..per_sender).map(|i| s * 1000 + i).collect();
            prop_assert_eq!(mine, expected);
        }

        got.sort_unstable();
        got.dedup();
        prop_assert_eq!(got.len(), senders * per_sender as usize);
    }
}
