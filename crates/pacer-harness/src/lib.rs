//! Deterministic simulation harness for pacer throttler testing.
//!
//! Virtual-time implementation of the Environment trait plus helpers for
//! reproducible timing tests.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation. Operations are
//! applied to both the model and the real throttler, and their recorded
//! executions are compared.
//!
//! # Scenarios
//!
//! The `scenario` module replays scripted calls at fixed virtual times inside
//! a turmoil simulation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod recorder;
pub mod scenario;
pub mod sim_env;

pub use model::{
    MODEL_INTERVAL_MS, MODEL_TICK_MS, ModelPending, ModelRun, ModelThrottler, Operation,
};
pub use recorder::{Recorder, Run};
pub use scenario::{Scenario, Step};
pub use sim_env::SimEnv;
