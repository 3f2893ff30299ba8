//! Simulation environment on Tokio virtual time.
//!
//! `SimEnv` reads `tokio::time::Instant`, which turmoil and a paused Tokio
//! clock both control. Timers and `now()` therefore agree exactly, making
//! throttling decisions reproducible to the millisecond.

use std::time::Duration;

use pacer_core::env::Environment;

/// Environment backed by Tokio's (possibly paused) clock.
///
/// Must be used inside a Tokio runtime: a turmoil host/client, or a runtime
/// built with `start_paused(true)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Create a new simulation environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
