//! Reference model of the throttler.
//!
//! Written independently of `pacer-core` so that it can serve as an oracle:
//! plain millisecond arithmetic, one optional pending item, and an explicit
//! virtual clock.
//!
//! Immediate work is not run at `execute` time but at the next time step,
//! mirroring the real worker which only gets to run once the caller yields.

use super::Operation;

/// A pending work item in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPending {
    /// Run id the item records.
    pub id: u32,
    /// Virtual millisecond at which it runs.
    pub due: u64,
}

/// Observable execution in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRun {
    /// Run id.
    pub id: u32,
    /// Virtual millisecond at which it ran.
    pub at: u64,
}

/// Reference throttler on a millisecond clock.
#[derive(Debug, Clone)]
pub struct ModelThrottler {
    interval_ms: u64,
    broadcast_latest: bool,
    tick_ms: u64,
    now: u64,
    previous_run: Option<u64>,
    pending: Option<ModelPending>,
    next_id: u32,
    runs: Vec<ModelRun>,
}

impl ModelThrottler {
    /// Create a model; `tick_ms` is the length of one `AdvanceTime` tick.
    pub fn new(interval_ms: u64, broadcast_latest: bool, tick_ms: u64) -> Self {
        Self {
            interval_ms,
            broadcast_latest,
            tick_ms,
            now: 0,
            previous_run: None,
            pending: None,
            next_id: 0,
            runs: Vec::new(),
        }
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: Operation) {
        match op {
            Operation::Execute => {
                self.execute();
            },
            Operation::Cancel => self.pending = None,
            Operation::AdvanceTime { .. } => self.advance(op.ticks() * self.tick_ms),
        }
    }

    /// Request an action; returns the id it will record if it runs.
    pub fn execute(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending = None;

        let throttled = self.previous_run.is_some_and(|prev| self.now - prev <= self.interval_ms);
        if !throttled || self.interval_ms == 0 {
            self.pending = Some(ModelPending { id, due: self.now });
        } else if self.broadcast_latest {
            self.pending = Some(ModelPending { id, due: self.now + self.interval_ms });
        }
        id
    }

    /// Advance the clock by `millis`, running pending work that falls due.
    pub fn advance(&mut self, millis: u64) {
        let target = self.now + millis;
        if let Some(pending) = self.pending
            && pending.due <= target
        {
            self.now = pending.due;
            self.runs.push(ModelRun { id: pending.id, at: pending.due });
            self.previous_run = Some(pending.due);
            self.pending = None;
        }
        self.now = target;
    }

    /// Every run so far, in order.
    pub fn runs(&self) -> &[ModelRun] {
        &self.runs
    }

    /// The pending item, if any.
    pub fn pending(&self) -> Option<ModelPending> {
        self.pending
    }

    /// Current virtual millisecond.
    pub fn now(&self) -> u64 {
        self.now
    }
}
