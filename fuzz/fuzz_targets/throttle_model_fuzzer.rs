//! Fuzz target for the throttling core against the reference model
//!
//! Drives `ThrottlePolicy` + `PendingSlot` exactly the way the runtime does
//! (cancel, decide, install, queue; begin/finish on dispatch) on a virtual
//! millisecond clock, and compares every run with `ModelThrottler`.
//!
//! # Strategy
//!
//! - Interval: 0..=255ms, including the zero-interval edge
//! - Policy: both broadcast and drop modes
//! - Ops: execute / cancel / advance time, arbitrary interleavings
//! - Stale jobs stay queued so ticket rejection is exercised
//!
//! # Invariants
//!
//! - Core and model record identical runs at identical times
//! - At most one live ticket after every operation
//! - A ticket begins at most once

#![no_main]

use std::{collections::HashSet, ops::Sub, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pacer_core::{PendingSlot, ThrottlePolicy, Ticket};
use pacer_harness::{MODEL_TICK_MS, ModelRun, ModelThrottler, Operation};

#[derive(Debug, Clone, Copy)]
struct Ms(u64);

impl Sub for Ms {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_millis(self.0 - rhs.0)
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    interval_ms: u8,
    broadcast_latest: bool,
    ops: Vec<Operation>,
}

/// Queued job: ticket, run id, due time.
type QueuedJob = (Ticket, u32, u64);

fuzz_target!(|input: Input| {
    let interval_ms = u64::from(input.interval_ms);
    let policy = ThrottlePolicy::new(Duration::from_millis(interval_ms), input.broadcast_latest);
    let mut model = ModelThrottler::new(interval_ms, input.broadcast_latest, MODEL_TICK_MS);

    let mut slot = PendingSlot::new();
    let mut previous_run: Option<Ms> = None;
    let mut now = 0u64;
    let mut next_id = 0u32;
    let mut queue: Vec<QueuedJob> = Vec::new();
    let mut begun: HashSet<Ticket> = HashSet::new();
    let mut runs: Vec<ModelRun> = Vec::new();

    for op in input.ops {
        model.apply(op);

        match op {
            Operation::Execute => {
                let id = next_id;
                next_id += 1;
                slot.cancel();
                let decision = policy.decide(previous_run, Ms(now));
                if let Some(delay) = decision.delay() {
                    let ticket = slot.install();
                    queue.push((ticket, id, now + delay.as_millis() as u64));
                }
            }
            Operation::Cancel => {
                slot.cancel();
            }
            Operation::AdvanceTime { .. } => {
                let target = now + op.ticks() * MODEL_TICK_MS;
                queue.sort_by_key(|(_, _, due)| *due);
                let split = queue.partition_point(|(_, _, due)| *due <= target);
                for (ticket, id, due) in queue.drain(..split) {
                    if slot.begin(ticket) {
                        assert!(begun.insert(ticket), "ticket {ticket:?} began twice");
                        runs.push(ModelRun { id, at: due });
                        previous_run = Some(Ms(due));
                        assert!(slot.finish(ticket));
                    }
                }
                now = target;
            }
        }

        if let Some(current) = slot.current() {
            assert!(
                queue.iter().filter(|(ticket, _, _)| *ticket == current).count() <= 1,
                "live ticket queued twice"
            );
        }
        assert_eq!(runs.as_slice(), model.runs(), "core diverged from model");
    }
});
