//! Throttle scheduling policy.
//!
//! Decides, for a single `execute` request, whether the action runs right
//! away, runs after a delay, or is dropped. The decision is a pure function of
//! the previous run, the current time, and the policy; callers pass time in so
//! the same code runs against real and virtual clocks.
//!
//! A throttled request is delayed by the *full* interval rather than the
//! remainder of the window. This is not a sliding window: a request arriving
//! 200ms into a 1s window runs `interval` after the request itself.

use std::{ops::Sub, time::Duration};

/// Spacing used when no interval is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leading edge: run as soon as the execution context is free.
    RunNow,

    /// Trailing edge: run once the delay has elapsed, unless superseded.
    RunAfter(Duration),

    /// Throttled away with latest-event broadcasting disabled.
    Drop,
}

impl Decision {
    /// Delay to hand to the execution context, `None` when nothing runs.
    pub fn delay(self) -> Option<Duration> {
        match self {
            Self::RunNow => Some(Duration::ZERO),
            Self::RunAfter(delay) => Some(delay),
            Self::Drop => None,
        }
    }

    /// Returns true if this decision installs a pending work item.
    pub fn schedules(self) -> bool {
        !matches!(self, Self::Drop)
    }
}

/// Rate-limiting policy: minimum spacing plus the trailing-edge choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Minimum spacing between consecutive executions.
    pub interval: Duration,
    /// Whether the latest throttled-away request still fires after the window.
    pub broadcast_latest: bool,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self { interval: DEFAULT_INTERVAL, broadcast_latest: true }
    }
}

impl ThrottlePolicy {
    /// Create a policy with the given spacing and trailing-edge choice.
    pub fn new(interval: Duration, broadcast_latest: bool) -> Self {
        Self { interval, broadcast_latest }
    }

    /// Decide what to do with a request arriving at `now`.
    ///
    /// `previous_run` is the completion time of the last action that actually
    /// ran, or `None` if nothing has run yet (treated as infinitely long ago).
    pub fn decide<I>(&self, previous_run: Option<I>, now: I) -> Decision
    where
        I: Copy + Sub<Output = Duration>,
    {
        let outside_window = match previous_run {
            None => true,
            Some(previous) => now - previous > self.interval,
        };

        if outside_window {
            Decision::RunNow
        } else if self.interval.is_zero() {
            // Zero interval with a same-instant previous run: delay would be 0
            Decision::RunNow
        } else if self.broadcast_latest {
            Decision::RunAfter(self.interval)
        } else {
            Decision::Drop
        }
    }
}
