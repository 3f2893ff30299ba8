//! Operations for model-based testing.
//!
//! Operations represent everything a caller can do to a throttler, plus the
//! passage of time. They are generated randomly by proptest (or libFuzzer)
//! and applied to both the model and the real implementation.

use arbitrary::Arbitrary;

/// Operations that can be applied to a throttler.
///
/// Execute operations carry no payload: the driver numbers them in order, so
/// the n-th `Execute` records run id `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Request an action.
    Execute,

    /// Cancel the pending action.
    Cancel,

    /// Advance virtual time by `ticks` driver ticks (clamped to at least 1).
    ///
    /// Pending work due within the step runs before the step ends.
    AdvanceTime {
        /// Number of ticks to advance.
        ticks: u8,
    },
}

impl Operation {
    /// Ticks this operation advances time by (0 for non-time operations).
    pub fn ticks(self) -> u64 {
        match self {
            Self::AdvanceTime { ticks } => u64::from(ticks.max(1)),
            Self::Execute | Self::Cancel => 0,
        }
    }
}
