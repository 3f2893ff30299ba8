//! Execution recorder for throttled actions.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

/// One action that actually executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Identifier passed when the action was created
    pub id: u32,
    /// Virtual time since the recorder was created
    pub at: Duration,
}

impl Run {
    /// Shorthand for building expectations.
    pub fn new(id: u32, at_millis: u64) -> Self {
        Self { id, at: Duration::from_millis(at_millis) }
    }
}

/// Collects [`Run`]s from actions handed to a throttler.
///
/// Clones share the same log. Time is measured on Tokio's clock, so create
/// the recorder inside the runtime that drives the throttler.
#[derive(Debug, Clone)]
pub struct Recorder {
    start: tokio::time::Instant,
    runs: Arc<Mutex<Vec<Run>>>,
}

impl Recorder {
    /// Start recording at the current virtual instant.
    pub fn start() -> Self {
        Self { start: tokio::time::Instant::now(), runs: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Build an action that records `id` when it runs.
    pub fn action(&self, id: u32) -> impl FnOnce() + Send + use<> {
        let start = self.start;
        let runs = Arc::clone(&self.runs);
        move || {
            let at = start.elapsed();
            runs.lock().unwrap_or_else(PoisonError::into_inner).push(Run { id, at });
        }
    }

    /// Virtual time elapsed since recording started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Snapshot of everything recorded so far, in execution order.
    pub fn runs(&self) -> Vec<Run> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Identifiers of recorded runs, in execution order.
    pub fn ids(&self) -> Vec<u32> {
        self.runs().into_iter().map(|run| run.id).collect()
    }
}
