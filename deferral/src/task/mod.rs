//! Deferred-result tasks.
//!
//! A task is observed through a [`TaskHandle`] and completed through a
//! [`TaskSource`]. The handle is handed out as soon as an operation starts,
//! so callers can start several operations before waiting on any of them:
//!
//! ```rust,ignore
//! let foo = repo.get_foo();          // started, not awaited
//! let bar = repo.get_bar().result()?; // wait on bar first
//! let foo = foo.result()?;           // then on foo
//! ```
//!
//! Both operations run concurrently underneath; the order of waiting only
//! decides the order in which the caller observes them.

mod core;
mod handle;
mod source;
mod status;
mod when_all;

pub use handle::TaskHandle;
pub use source::TaskSource;
pub use status::TaskStatus;
pub use when_all::when_all;

use crate::awaitable::Awaitable;
use crate::error::{TaskError, TaskResult};
use crate::scheduler;

/// A task that already completed with `value`.
pub fn from_result<T>(value: T) -> TaskHandle<T>
where
    T: Clone + Send + 'static,
{
    let (source, handle) = TaskSource::new();
    source.set_result(value);
    handle
}

/// A task that already failed with `error`.
pub fn from_error<T>(error: TaskError) -> TaskHandle<T>
where
    T: Clone + Send + 'static,
{
    let (source, handle) = TaskSource::new();
    source.set_error(error);
    handle
}

/// Runs `work` on a background thread of the current scheduler.
///
/// See [`SchedulerHandle::run_in_background`](crate::scheduler::SchedulerHandle::run_in_background).
///
/// # Panics
///
/// Panics if called outside of a scheduler context.
pub fn run_in_background<T, F>(work: F) -> Awaitable<T>
where
    T: Send + 'static,
    F: FnOnce() -> TaskResult<T> + Send + 'static,
{
    scheduler::current().run_in_background(work)
}
