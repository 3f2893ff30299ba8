//! Error types for the pacer core.
//!
//! Throttling itself is infallible. The only failures live at the boundary to
//! the execution context: spawning a worker without a runtime, or submitting
//! work after the worker has shut down.

use thiserror::Error;

/// Errors raised by a serial execution context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// No async runtime available to host the worker
    #[error("no async runtime available to spawn worker {label:?}")]
    NoRuntime {
        /// Label of the worker that could not be started
        label: String,
    },

    /// Worker has stopped and no longer accepts jobs
    #[error("worker {label:?} is closed")]
    Closed {
        /// Label of the closed worker
        label: String,
    },
}

impl ExecutorError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Neither variant is: a missing runtime is a setup bug, and a closed
    /// worker never reopens.
    pub fn is_transient(&self) -> bool {
        false
    }

    /// Label of the worker this error refers to.
    pub fn label(&self) -> &str {
        match self {
            Self::NoRuntime { label } | Self::Closed { label } => label,
        }
    }
}
