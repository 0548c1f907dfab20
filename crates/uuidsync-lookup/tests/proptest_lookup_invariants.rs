//! Property-based invariant tests for the lookup session.
//!
//! 1. A burst of live edits, each inside the debounce window, sends exactly
//!    one request: the last one.
//! 2. Under any interleaving of requests, time steps and polls, the trace
//!    never shows two requests in flight and tokens only grow.
//! 3. Out-of-order completions never apply a superseded answer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use uuidsync_core::UuidValue;
use uuidsync_lookup::{
    CancelToken, Dispatcher, InlineDispatcher, LookupConfig, LookupError, LookupJob, LookupKey,
    LookupRequest, LookupSession, Profile, Resolver,
};
use web_time::Instant;

const DEBOUNCE_MS: u64 = 100;
const NAMES: [&str; 4] = ["alice", "bob", "carol", "dave"];

// ── Helpers ─────────────────────────────────────────────────────────────

/// Resolves every name to an id derived from its length and records calls.
#[derive(Clone, Default)]
struct Echo {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Resolver for Echo {
    fn resolve(&self, key: &LookupKey, _: &CancelToken) -> Result<Profile, LookupError> {
        let label = key.label();
        self.calls.lock().unwrap().push(label.clone());
        if label == "dave" {
            return Err(LookupError::NotFound);
        }
        Ok(Profile::new(
            UuidValue::from_u64_pair(0, label.len() as u64),
            label,
        ))
    }
}

#[derive(Clone, Default)]
struct Deferred {
    jobs: Arc<Mutex<Vec<LookupJob>>>,
}

impl Dispatcher for Deferred {
    fn dispatch(&mut self, job: LookupJob) {
        self.jobs.lock().unwrap().push(job);
    }
}

fn session(resolver: &Echo, dispatcher: Box<dyn Dispatcher>) -> LookupSession {
    LookupSession::new(
        Arc::new(resolver.clone()),
        dispatcher,
        LookupConfig::default()
            .with_debounce(Duration::from_millis(DEBOUNCE_MS))
            .with_trace_capacity(10_000),
    )
}

fn forward(index: usize, commit: bool) -> LookupRequest {
    LookupRequest::forward(LookupKey::Name(NAMES[index].to_owned()), commit)
}

#[derive(Debug, Clone)]
enum Op {
    Live(usize),
    Commit(usize),
    Wait(u64),
    Poll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NAMES.len()).prop_map(Op::Live),
        (0..NAMES.len()).prop_map(Op::Commit),
        (0..2 * DEBOUNCE_MS).prop_map(Op::Wait),
        Just(Op::Poll),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Debounce coalescing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn burst_of_live_edits_sends_only_the_last(
        edits in prop::collection::vec((0..NAMES.len(), 0..DEBOUNCE_MS), 1..20)
    ) {
        let resolver = Echo::default();
        let mut s = session(&resolver, Box::new(InlineDispatcher));
        let mut now = Instant::now();
        for (index, gap) in &edits {
            s.request(forward(*index, false), now, false);
            now += Duration::from_millis(*gap);
            s.poll(now);
        }
        prop_assert!(resolver.calls.lock().unwrap().is_empty());

        s.poll(now + Duration::from_millis(DEBOUNCE_MS));
        let last = NAMES[edits[edits.len() - 1].0].to_owned();
        prop_assert_eq!(resolver.calls.lock().unwrap().clone(), vec![last]);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Single flight and monotonic tokens
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn trace_stays_single_flight(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let resolver = Echo::default();
        let mut s = session(&resolver, Box::new(InlineDispatcher));
        let mut now = Instant::now();
        for op in ops {
            match op {
                Op::Live(index) => s.request(forward(index, false), now, false),
                Op::Commit(index) => s.request(forward(index, true), now, true),
                Op::Wait(ms) => now += Duration::from_millis(ms),
                Op::Poll => {
                    s.poll(now);
                }
            }
        }
        let violations = s.trace().verify_invariants();
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Stale completions
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn only_the_newest_answer_applies(
        names in prop::collection::vec(0..3usize, 2..8),
        order in any::<prop::sample::Index>(),
    ) {
        let resolver = Echo::default();
        let deferred = Deferred::default();
        let mut s = session(&resolver, Box::new(deferred.clone()));
        let now = Instant::now();
        for index in &names {
            s.request(forward(*index, true), now, true);
        }

        let mut jobs = std::mem::take(&mut *deferred.jobs.lock().unwrap());
        let rotate = order.index(jobs.len());
        jobs.rotate_left(rotate);
        for job in jobs {
            job();
        }
        let applied = s.poll(now);

        let last = NAMES[names[names.len() - 1]];
        prop_assert_eq!(applied.len(), 1);
        prop_assert_eq!(applied[0].request.key.label(), last);
        prop_assert_eq!(s.loaded().map(|p| p.name.as_str()), Some(last));
        prop_assert_eq!(s.trace().count("applied"), 1);
    }
}
