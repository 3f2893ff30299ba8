//! Throttler configuration.

use std::time::Duration;

use pacer_core::DEFAULT_INTERVAL;

use crate::executor::DEFAULT_WORKER_LABEL;

/// Configuration for a [`crate::Throttler`] and the worker it spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlerConfig {
    /// Minimum spacing between consecutive executions
    pub interval: Duration,
    /// Run the latest throttled-away call once the window closes
    pub broadcast_latest: bool,
    /// Label of the dedicated worker (used in log events)
    pub label: String,
}

impl Default for ThrottlerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            broadcast_latest: true,
            label: DEFAULT_WORKER_LABEL.to_string(),
        }
    }
}

impl ThrottlerConfig {
    /// Default configuration with the given interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval, ..Self::default() }
    }

    /// Set the trailing-edge policy.
    #[must_use]
    pub fn broadcast_latest(mut self, broadcast_latest: bool) -> Self {
        self.broadcast_latest = broadcast_latest;
        self
    }

    /// Set the worker label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
