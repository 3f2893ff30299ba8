//! Pacer core: sans-IO throttling logic.
//!
//! Everything here is pure: time is passed in, decisions are returned, and no
//! task is spawned. The runtime crate wraps these pieces with a lock and a
//! serial worker.
//!
//! # Components
//!
//! - [`env::Environment`]: Clock abstraction (real or virtual time)
//! - [`ThrottlePolicy`]: Leading/trailing-edge scheduling decision
//! - [`PendingSlot`]: At-most-one pending work item, keyed by generation
//! - [`ExecutorError`]: Failures at the execution-context boundary

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod policy;
pub mod slot;

pub use error::ExecutorError;
pub use policy::{DEFAULT_INTERVAL, Decision, ThrottlePolicy};
pub use slot::{PendingSlot, SlotState, Ticket};
