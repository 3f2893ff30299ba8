//! Environment abstraction for deterministic testing.
//!
//! Decouples throttling logic from the system clock. Enables deterministic
//! simulation with Turmoil or a paused Tokio clock (virtual time) and
//! production use with real time.

use std::time::Duration;

/// Abstract environment providing time and async sleeping.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `sleep()` completes no earlier than the requested duration on the same
///   clock that `now()` reads
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time (e.g., `tokio::time::Instant` driven by
    /// turmoil).
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - This method MUST return values that never decrease within a single
    ///   execution context. Subsequent calls must return times >= previous
    ///   calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by executor code (not throttling policy).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
