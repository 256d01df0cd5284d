//! Delays and timeouts on the current scheduler.
//!
//! This module provides:
//! - [`delay`] for awaiting a duration,
//! - [`timeout`] for bounding how long an operation may take.
//!
//! Both resolve the scheduler through the thread-local context installed by
//! [`Scheduler::enter`](crate::Scheduler::enter) and on every scheduler
//! thread. Use [`SchedulerHandle`](crate::SchedulerHandle) directly to avoid
//! the context lookup.

pub(crate) mod timeout;

use crate::awaitable::Awaitable;
use crate::scheduler;

use std::time::Duration;

/// Returns an awaitable that completes once `duration` has elapsed.
///
/// # Panics
///
/// Panics if called outside of a scheduler context.
///
/// # Examples
///
/// ```rust,ignore
/// let delay = time::delay(Duration::from_millis(500));
/// Ok(Step::Await(delay.suspend_at(0)))
/// ```
pub fn delay(duration: Duration) -> Awaitable<()> {
    scheduler::current().after(duration)
}

/// Races `target` against a timer of `duration` on the current scheduler.
///
/// Completes with [`TaskError::TimedOut`](crate::TaskError::TimedOut) if the
/// timer fires first.
///
/// # Panics
///
/// Panics if called outside of a scheduler context.
pub fn timeout<T>(duration: Duration, target: Awaitable<T>) -> Awaitable<T>
where
    T: Clone + Send + 'static,
{
    scheduler::current().timeout(duration, target)
}
