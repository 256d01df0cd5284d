use super::core::TaskCore;
use super::status::TaskStatus;
use crate::awaitable::Awaitable;
use crate::error::{TaskError, TaskResult};
use crate::signal::SignalPoll;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// A handle to a value that becomes available asynchronously.
///
/// Handles are returned as soon as an operation starts, before it finishes.
/// Any number of clones may observe the same task; every one of them sees the
/// same outcome.
///
/// Reading the result comes in two flavours:
/// - non-blocking: [`poll`](Self::poll) and [`try_result`](Self::try_result),
///   the latter failing with [`TaskError::NotReady`] before completion;
/// - blocking: [`wait`](Self::wait) and [`result`](Self::result), which park
///   the calling thread on a condition variable until the task finishes.
///
/// A `TaskHandle` is also a [`Future`], so it can be awaited from any
/// executor.
pub struct TaskHandle<T>
where
    T: Clone + Send + 'static,
{
    core: Arc<TaskCore<T>>,
}

impl<T> TaskHandle<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn from_core(core: Arc<TaskCore<T>>) -> Self {
        Self { core }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TaskStatus {
        match self.core.poll() {
            SignalPoll::Pending => TaskStatus::Pending,
            SignalPoll::Ready(outcome) => TaskStatus::of(&outcome),
        }
    }

    /// Returns `true` once the task has published an outcome.
    pub fn is_completed(&self) -> bool {
        self.core.is_complete()
    }

    /// Non-blocking read of the outcome.
    pub fn poll(&self) -> SignalPoll<T> {
        self.core.poll()
    }

    /// Returns the outcome, or [`TaskError::NotReady`] while still pending.
    pub fn try_result(&self) -> TaskResult<T> {
        match self.core.poll() {
            SignalPoll::Ready(outcome) => outcome,
            SignalPoll::Pending => Err(TaskError::NotReady),
        }
    }

    /// Blocks the calling thread until the task finishes.
    pub fn wait(&self) {
        self.core.wait();
    }

    /// Blocks for at most `timeout`. Returns `true` if the task finished.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.core.wait_timeout(timeout)
    }

    /// Blocks until the task finishes, then returns its outcome.
    pub fn result(&self) -> TaskResult<T> {
        self.core.wait();
        self.try_result()
    }

    /// Waits by sleeping `interval` between completion checks.
    ///
    /// Fallback for callers that cannot park on the task. Every check costs a
    /// wake-up and the latency is up to one full interval, so prefer
    /// [`result`](Self::result).
    pub fn wait_polling(&self, interval: Duration) -> TaskResult<T> {
        loop {
            if let SignalPoll::Ready(outcome) = self.core.poll() {
                return outcome;
            }

            trace!(?interval, "task still pending, polling again");
            thread::sleep(interval);
        }
    }

    /// Runs `callback` with the outcome once the task finishes.
    ///
    /// Runs inline when the task has already finished. Callbacks registered
    /// before completion run on the thread that publishes the outcome.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(TaskResult<T>) + Send + 'static,
    {
        self.core.subscribe(Box::new(callback));
    }

    /// Returns a fresh [`Awaitable`] that completes with this task.
    ///
    /// Each call yields an awaitable with its own continuation slot, so
    /// several state machines can suspend on the same task.
    pub fn awaitable(&self) -> Awaitable<T> {
        if let SignalPoll::Ready(outcome) = self.core.poll() {
            return match outcome {
                Ok(value) => Awaitable::ready(value),
                Err(err) => Awaitable::failed(err),
            };
        }

        let (signal, awaitable) = Awaitable::pending();
        self.core.subscribe(Box::new(move |outcome| {
            let _ = signal.publish(outcome);
        }));

        awaitable
    }
}

impl<T> Clone for TaskHandle<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> Future for TaskHandle<T>
where
    T: Clone + Send + 'static,
{
    type Output = TaskResult<T>;

    /// Registers the waker **before** re-checking completion so a wake-up
    /// racing with this poll is never missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let SignalPoll::Ready(outcome) = self.core.poll() {
            return Poll::Ready(outcome);
        }

        self.core.register_waker(cx.waker());

        match self.core.poll() {
            SignalPoll::Ready(outcome) => Poll::Ready(outcome),
            SignalPoll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("status", &self.status())
            .finish()
    }
}
