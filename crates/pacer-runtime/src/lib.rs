//! Pacer runtime.
//!
//! Production glue around [`pacer_core`]: a Tokio-hosted serial worker and the
//! thread-safe [`Throttler`] that schedules onto it.
//!
//! # Architecture
//!
//! The scheduling decision ([`pacer_core::ThrottlePolicy`]) and the pending
//! slot ([`pacer_core::PendingSlot`]) are pure. [`Throttler`] guards them with
//! one lock and hands accepted work to a [`SerialExecutor`], which runs jobs
//! one at a time in FIFO order on a dedicated task.
//!
//! # Components
//!
//! - [`Throttler`]: Leading-edge / latest-wins rate limiter
//! - [`SerialExecutor`]: Single-worker execution context with delayed submit
//! - [`ThrottlerConfig`]: Interval, policy, and worker label
//! - [`SystemEnv`]: Production environment (real time, Tokio timers)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod executor;
mod system_env;
mod throttler;

pub use config::ThrottlerConfig;
pub use executor::{DEFAULT_WORKER_LABEL, Job, SerialExecutor};
pub use pacer_core::{ExecutorError, env::Environment};
pub use system_env::SystemEnv;
pub use throttler::Throttler;
