//! Serial execution context.
//!
//! A [`SerialExecutor`] owns exactly one worker task that drains a FIFO queue
//! of jobs, one at a time. Delayed jobs wait on a separate timer task and are
//! pushed onto the queue when their delay elapses, so timers never run jobs
//! themselves and two jobs can never overlap.
//!
//! Jobs run inline on the worker task. A job that blocks stalls every other
//! job on the same executor (and the runtime thread hosting it).

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use pacer_core::{ExecutorError, env::Environment};
use tokio::{runtime::Handle, sync::mpsc, task::AbortHandle};

/// Label used when none is configured.
pub const DEFAULT_WORKER_LABEL: &str = "pacer.throttler";

/// Unit of work accepted by the executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a single serial worker.
///
/// Cloning the handle shares the worker. The worker stops once every handle
/// (and every in-flight timer) is gone and the queue has drained.
pub struct SerialExecutor<E: Environment> {
    env: E,
    label: Arc<str>,
    sender: mpsc::UnboundedSender<Job>,
    runtime: Handle,
}

impl<E: Environment> Clone for SerialExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            env: self.env.clone(),
            label: Arc::clone(&self.label),
            sender: self.sender.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<E: Environment> std::fmt::Debug for SerialExecutor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialExecutor")
            .field("label", &self.label)
            .field("closed", &self.sender.is_closed())
            .finish_non_exhaustive()
    }
}

impl<E: Environment> SerialExecutor<E> {
    /// Spawn a worker on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::NoRuntime`] when called outside a runtime.
    pub fn spawn(env: E, label: impl Into<String>) -> Result<Self, ExecutorError> {
        let label: String = label.into();
        let Ok(runtime) = Handle::try_current() else {
            return Err(ExecutorError::NoRuntime { label });
        };

        let label: Arc<str> = label.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        runtime.spawn(run_worker(Arc::clone(&label), receiver));
        tracing::debug!(worker = %label, "serial worker started");

        Ok(Self { env, label, sender, runtime })
    }

    /// Queue `job` to run after `delay`.
    ///
    /// Zero-delay jobs go straight to the back of the queue. Delayed jobs are
    /// queued when their timer fires, behind whatever is queued at that point.
    ///
    /// For a delayed job, returns a handle to its timer. Aborting the timer
    /// before it fires drops the job without running it; afterwards it has no
    /// effect.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Closed`] if the worker has stopped.
    pub fn submit(&self, delay: Duration, job: Job) -> Result<Option<AbortHandle>, ExecutorError> {
        if self.sender.is_closed() {
            return Err(self.closed());
        }

        if delay.is_zero() {
            return self.sender.send(job).map(|()| None).map_err(|_| self.closed());
        }

        let env = self.env.clone();
        let sender = self.sender.clone();
        let label = Arc::clone(&self.label);
        let timer = self.runtime.spawn(async move {
            env.sleep(delay).await;
            if sender.send(job).is_err() {
                tracing::warn!(worker = %label, ?delay, "worker closed before delayed job fired");
            }
        });
        Ok(Some(timer.abort_handle()))
    }

    /// Environment used for timers.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Worker label, used in log events.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns true if the worker has stopped accepting jobs.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn closed(&self) -> ExecutorError {
        ExecutorError::Closed { label: self.label.to_string() }
    }
}

/// Drain the queue until every sender is dropped.
async fn run_worker(label: Arc<str>, mut receiver: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = receiver.recv().await {
        tracing::trace!(worker = %label, "running job");
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::warn!(worker = %label, "job panicked; worker continues");
        }
    }
    tracing::debug!(worker = %label, "serial worker stopped");
}
