//! Timed scenarios under turmoil.
//!
//! A [`Scenario`] is a script of calls at fixed virtual times. Running it
//! spawns a real [`Throttler`] on [`SimEnv`] inside a turmoil simulation,
//! replays the script, waits for trailing work to settle, and returns what
//! actually executed.
//!
//! ```ignore
//! let runs = Scenario::new(ThrottlerConfig::with_interval(Duration::from_secs(1)))
//!     .execute_at(0, 1)
//!     .execute_at(200, 2)
//!     .run()?;
//! ```

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use pacer_runtime::{Throttler, ThrottlerConfig};

use crate::{Recorder, Run, SimEnv};

/// Extra simulated time allowed past the settle period.
const HORIZON_SLACK: Duration = Duration::from_secs(1);

/// One scripted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `execute` an action that records `id`
    Execute(u32),
    /// `cancel` the pending action
    Cancel,
    /// `set_interval` to the given value
    SetInterval(Duration),
}

/// Script of throttler calls at fixed virtual times.
#[derive(Debug, Clone)]
pub struct Scenario {
    config: ThrottlerConfig,
    steps: Vec<(Duration, Step)>,
    settle: Duration,
}

impl Scenario {
    /// Empty script for a throttler built from `config`.
    ///
    /// By default the run waits three intervals after the last step.
    pub fn new(config: ThrottlerConfig) -> Self {
        let settle = config.interval * 3;
        Self { config, steps: Vec::new(), settle }
    }

    /// Add `step` at `at_millis` after the start.
    ///
    /// Steps at the same instant apply in insertion order.
    #[must_use]
    pub fn step(mut self, at_millis: u64, step: Step) -> Self {
        self.steps.push((Duration::from_millis(at_millis), step));
        self
    }

    /// Add an `execute` recording `id` at `at_millis`.
    #[must_use]
    pub fn execute_at(self, at_millis: u64, id: u32) -> Self {
        self.step(at_millis, Step::Execute(id))
    }

    /// Add a `cancel` at `at_millis`.
    #[must_use]
    pub fn cancel_at(self, at_millis: u64) -> Self {
        self.step(at_millis, Step::Cancel)
    }

    /// Add a `set_interval` at `at_millis`.
    #[must_use]
    pub fn set_interval_at(self, at_millis: u64, interval: Duration) -> Self {
        self.step(at_millis, Step::SetInterval(interval))
    }

    /// Override how long to wait after the last step.
    #[must_use]
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Replay the script and return every action that ran, in order.
    pub fn run(self) -> turmoil::Result<Vec<Run>> {
        let Self { config, mut steps, settle } = self;
        steps.sort_by_key(|(at, _)| *at);

        let last = steps.last().map(|(at, _)| *at).unwrap_or_default();
        let horizon = last + settle + HORIZON_SLACK;
        let mut sim = turmoil::Builder::new().simulation_duration(horizon).build();

        let runs: Arc<Mutex<Vec<Run>>> = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&runs);

        sim.client("throttler", async move {
            let throttler = Throttler::spawn(SimEnv::new(), &config)?;
            let recorder = Recorder::start();
            let start = tokio::time::Instant::now();

            for (at, step) in steps {
                tokio::time::sleep_until(start + at).await;
                tracing::trace!(?at, ?step, "scenario step");
                match step {
                    Step::Execute(id) => throttler.execute(recorder.action(id)),
                    Step::Cancel => throttler.cancel(),
                    Step::SetInterval(interval) => throttler.set_interval(interval),
                }
            }

            tokio::time::sleep(settle).await;
            *out.lock().unwrap_or_else(PoisonError::into_inner) = recorder.runs();
            Ok(())
        });

        sim.run()?;

        let runs = runs.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(runs)
    }
}
