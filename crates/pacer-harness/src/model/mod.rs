//! Model-based testing support.
//!
//! [`ModelThrottler`] is a reference implementation. Operations are applied to
//! both the model and the real [`pacer_runtime::Throttler`] running on virtual
//! time, and the recorded executions are compared.
//!
//! # Timing
//!
//! The driver advances time in whole ticks of [`MODEL_TICK_MS`]. The interval
//! [`MODEL_INTERVAL_MS`] is deliberately not a multiple of the tick, so a
//! trailing run (due `interval` after a tick boundary) can never coincide with
//! the instant the driver wakes up. That keeps the interleaving of driver and
//! worker unambiguous.

mod operation;
mod throttler;

pub use operation::Operation;
pub use throttler::{ModelPending, ModelRun, ModelThrottler};

/// Length of one `AdvanceTime` tick in milliseconds.
pub const MODEL_TICK_MS: u64 = 10;

/// Throttle interval used in model equivalence runs.
pub const MODEL_INTERVAL_MS: u64 = 105;
