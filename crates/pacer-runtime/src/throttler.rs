//! Time-window throttler.
//!
//! Wraps the sans-IO [`ThrottlePolicy`] and [`PendingSlot`] with a lock and a
//! [`SerialExecutor`]. Every `execute` cancels whatever is pending, decides
//! with the current interval, and installs at most one new work item.
//!
//! # Cancellation race
//!
//! A work item checks its ticket and marks itself running under the same lock
//! that `execute` and `cancel` use. A cancel that lands at the instant the
//! worker dispatches the item may therefore lose (the action runs) or win
//! (it doesn't), but one `execute` never yields two runs. Narrowing this
//! further would mean blocking `execute` on the worker.
//!
//! Superseded and cancelled items also have their timer aborted, so a long
//! interval does not keep their actions alive until the delay would have
//! expired.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use pacer_core::{Decision, ExecutorError, PendingSlot, ThrottlePolicy, Ticket, env::Environment};
use tokio::task::AbortHandle;

use crate::{ThrottlerConfig, executor::SerialExecutor};

/// Mutable throttling state, guarded by one lock.
struct State<I> {
    interval: Duration,
    /// Completion time of the last action that ran. `None` = never.
    previous_run: Option<I>,
    slot: PendingSlot,
    /// Timer of the scheduled item, until it fires.
    timer: Option<AbortHandle>,
}

impl<I> State<I> {
    /// Cancel the pending item and release its timer.
    fn cancel(&mut self) -> Option<Ticket> {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.slot.cancel()
    }
}

/// State shared with scheduled jobs (which hold it weakly).
struct Shared<E: Environment> {
    env: E,
    broadcast_latest: bool,
    state: Mutex<State<E::Instant>>,
}

impl<E: Environment> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, State<E::Instant>> {
        // Actions run outside the lock, so poisoning can only come from our own
        // bookkeeping; the state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Body of a scheduled work item.
    fn run<F: FnOnce()>(&self, ticket: Ticket, action: F) {
        {
            let mut state = self.lock();
            if !state.slot.begin(ticket) {
                tracing::trace!(generation = ticket.generation(), "skipping cancelled work item");
                return;
            }
            // The timer of a running item has already fired
            state.timer = None;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(action));

        let finished_at = self.env.now();
        {
            let mut state = self.lock();
            state.previous_run = Some(finished_at);
            state.slot.finish(ticket);
        }

        if let Err(payload) = outcome {
            panic::resume_unwind(payload);
        }
    }
}

/// Rate-limits how often supplied actions execute.
///
/// The first call in a burst runs immediately. Calls arriving within
/// `interval` of the last completed run are either delayed by the full
/// interval (latest call wins) or dropped, depending on `broadcast_latest`.
///
/// Safe to share across threads. Actions run on the executor's single worker,
/// never concurrently with each other. Dropping the throttler cancels pending
/// work; nothing is flushed.
pub struct Throttler<E: Environment> {
    shared: Arc<Shared<E>>,
    executor: SerialExecutor<E>,
}

impl<E: Environment> Throttler<E> {
    /// Create a throttler that schedules work on `executor`.
    pub fn new(interval: Duration, broadcast_latest: bool, executor: SerialExecutor<E>) -> Self {
        let shared = Arc::new(Shared {
            env: executor.env().clone(),
            broadcast_latest,
            state: Mutex::new(State {
                interval,
                previous_run: None,
                slot: PendingSlot::new(),
                timer: None,
            }),
        });
        Self { shared, executor }
    }

    /// Create a throttler from `config`, sharing an existing executor.
    pub fn from_config(config: &ThrottlerConfig, executor: SerialExecutor<E>) -> Self {
        Self::new(config.interval, config.broadcast_latest, executor)
    }

    /// Create a throttler with its own dedicated worker.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::NoRuntime`] when called outside a Tokio
    /// runtime.
    pub fn spawn(env: E, config: &ThrottlerConfig) -> Result<Self, ExecutorError> {
        let executor = SerialExecutor::spawn(env, config.label.clone())?;
        Ok(Self::from_config(config, executor))
    }

    /// Throttle `action`.
    ///
    /// Cancels the pending action if any. Runs `action` as soon as the worker
    /// is free if the last run finished more than `interval` ago; otherwise
    /// schedules it `interval` from now, or drops it when latest-event
    /// broadcasting is off. Never blocks on the action.
    pub fn execute<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        let superseded = state.cancel();

        let now = self.shared.env.now();
        let policy = ThrottlePolicy::new(state.interval, self.shared.broadcast_latest);
        let decision = policy.decide(state.previous_run, now);

        let Some(delay) = decision.delay() else {
            tracing::debug!(
                worker = self.executor.label(),
                superseded = superseded.map(Ticket::generation),
                "throttled call dropped"
            );
            return;
        };

        let ticket = state.slot.install();
        let shared: Weak<Shared<E>> = Arc::downgrade(&self.shared);
        let job = Box::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.run(ticket, action);
            }
        });

        tracing::debug!(
            worker = self.executor.label(),
            generation = ticket.generation(),
            superseded = superseded.map(Ticket::generation),
            trailing = matches!(decision, Decision::RunAfter(_)),
            ?delay,
            "scheduling throttled call"
        );

        match self.executor.submit(delay, job) {
            Ok(timer) => state.timer = timer,
            Err(err) => {
                tracing::warn!(%err, "discarding throttled call");
                state.slot.finish(ticket);
            }
        }
    }

    /// Cancel the pending action, if any. Running actions are not affected.
    pub fn cancel(&self) {
        if let Some(ticket) = self.shared.lock().cancel() {
            tracing::debug!(
                worker = self.executor.label(),
                generation = ticket.generation(),
                "cancelled pending call"
            );
        }
    }

    /// Current minimum spacing between executions.
    pub fn interval(&self) -> Duration {
        self.shared.lock().interval
    }

    /// Change the spacing. Applies from the next `execute`; already scheduled
    /// work keeps its delay.
    pub fn set_interval(&self, interval: Duration) {
        self.shared.lock().interval = interval;
    }

    /// Whether the latest throttled call runs after the window.
    pub fn broadcast_latest(&self) -> bool {
        self.shared.broadcast_latest
    }

    /// Returns true while a work item is scheduled or running.
    pub fn has_pending(&self) -> bool {
        !self.shared.lock().slot.is_empty()
    }

    /// Executor this throttler schedules on.
    pub fn executor(&self) -> &SerialExecutor<E> {
        &self.executor
    }
}

impl<E: Environment> Drop for Throttler<E> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<E: Environment> std::fmt::Debug for Throttler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Throttler")
            .field("interval", &state.interval)
            .field("broadcast_latest", &self.shared.broadcast_latest)
            .field("previous_run", &state.previous_run)
            .field("slot", &state.slot.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = tokio::time::Instant;

        fn now(&self) -> Self::Instant {
            tokio::time::Instant::now()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            tokio::time::sleep(duration)
        }
    }

    type Log = Arc<Mutex<Vec<(&'static str, Duration)>>>;

    fn record(
        log: &Log,
        start: tokio::time::Instant,
        name: &'static str,
    ) -> impl FnOnce() + Send + use<> {
        let log = Arc::clone(log);
        move || log.lock().unwrap().push((name, start.elapsed()))
    }

    fn throttler(interval_ms: u64, broadcast_latest: bool) -> Throttler<TestEnv> {
        let config = ThrottlerConfig::with_interval(Duration::from_millis(interval_ms))
            .broadcast_latest(broadcast_latest);
        Throttler::spawn(TestEnv, &config).unwrap()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_runs_immediately() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(1000, true);

        throttler.execute(record(&log, start, "a"));
        assert!(throttler.has_pending());
        tokio::time::sleep(ms(1)).await;

        assert_eq!(*log.lock().unwrap(), vec![("a", ms(0))]);
        assert!(!throttler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn latest_call_wins_trailing_edge() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(1000, true);

        throttler.execute(record(&log, start, "a"));
        tokio::time::sleep(ms(200)).await;
        throttler.execute(record(&log, start, "b1"));
        tokio::time::sleep(ms(100)).await;
        throttler.execute(record(&log, start, "b2"));
        tokio::time::sleep(ms(2000)).await;

        assert_eq!(*log.lock().unwrap(), vec![("a", ms(0)), ("b2", ms(1300))]);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_mode_discards_throttled_calls() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(1000, false);

        throttler.execute(record(&log, start, "a"));
        tokio::time::sleep(ms(300)).await;
        throttler.execute(record(&log, start, "b"));
        assert!(!throttler.has_pending());
        tokio::time::sleep(ms(2000)).await;

        assert_eq!(*log.lock().unwrap(), vec![("a", ms(0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_scheduled_run() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(1000, true);

        throttler.execute(record(&log, start, "a"));
        tokio::time::sleep(ms(10)).await;
        throttler.execute(record(&log, start, "b"));
        throttler.cancel();
        throttler.cancel();
        assert!(!throttler.has_pending());
        tokio::time::sleep(ms(2000)).await;

        assert_eq!(*log.lock().unwrap(), vec![("a", ms(0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn set_interval_applies_to_next_decision() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(1000, true);

        throttler.execute(record(&log, start, "a"));
        tokio::time::sleep(ms(100)).await;
        throttler.set_interval(ms(50));
        assert_eq!(throttler.interval(), ms(50));
        throttler.execute(record(&log, start, "b"));
        tokio::time::sleep(ms(10)).await;

        assert_eq!(*log.lock().unwrap(), vec![("a", ms(0)), ("b", ms(100))]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_throttler_cancels_pending_work() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(1000, true);

        throttler.execute(record(&log, start, "a"));
        tokio::time::sleep(ms(10)).await;
        throttler.execute(record(&log, start, "b"));
        drop(throttler);
        tokio::time::sleep(ms(2000)).await;

        assert_eq!(*log.lock().unwrap(), vec![("a", ms(0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_calls_release_their_actions() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(3_600_000, true);
        let payload = Arc::new(());

        throttler.execute(record(&log, start, "a"));
        tokio::time::sleep(ms(1)).await;
        for _ in 0..100 {
            let payload = Arc::clone(&payload);
            throttler.execute(move || drop(payload));
        }
        tokio::time::sleep(ms(1)).await;

        // Only the latest call still holds the payload
        assert_eq!(Arc::strong_count(&payload), 2);

        throttler.cancel();
        tokio::time::sleep(ms(1)).await;
        assert_eq!(Arc::strong_count(&payload), 1);
        assert!(!throttler.has_pending());
    }

    #[test]
    fn execute_after_runtime_shutdown_discards_call() {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let throttler = runtime.block_on(async { throttler(1000, true) });
        drop(runtime);
        assert!(throttler.executor().is_closed());

        let log = Log::default();
        throttler.execute(record(&log, tokio::time::Instant::now(), "late"));

        assert!(!throttler.has_pending());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn action_may_reenter_throttler() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = Arc::new(throttler(100, true));

        let inner = Arc::clone(&throttler);
        let inner_log = Arc::clone(&log);
        throttler.execute(move || {
            inner_log.lock().unwrap().push(("outer", start.elapsed()));
            inner.execute(record(&inner_log, start, "inner"));
        });
        tokio::time::sleep(ms(500)).await;

        // previous_run is only set once the outer action returns, so the inner
        // call still sees an empty history and runs right after it
        assert_eq!(*log.lock().unwrap(), vec![("outer", ms(0)), ("inner", ms(0))]);
        assert!(!throttler.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_action_still_records_run() {
        let start = tokio::time::Instant::now();
        let log = Log::default();
        let throttler = throttler(1000, false);

        throttler.execute(|| panic!("action failed"));
        tokio::time::sleep(ms(10)).await;
        assert!(!throttler.has_pending());

        // The panicking action counted as a run, so this one is throttled
        throttler.execute(record(&log, start, "b"));
        tokio::time::sleep(ms(2000)).await;

        assert!(log.lock().unwrap().is_empty());
    }
}
