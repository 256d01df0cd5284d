use super::SchedulerHandle;

use std::cell::RefCell;

thread_local! {
    /// Scheduler installed for the current thread.
    ///
    /// Set on every scheduler thread and inside [`Scheduler::enter`](super::Scheduler::enter),
    /// so free functions such as [`time::delay`](crate::time::delay) can
    /// reach the scheduler without it being passed around.
    static CURRENT: RefCell<Option<SchedulerHandle>> = const { RefCell::new(None) };
}

/// Restores the previously installed scheduler when dropped, including
/// when `f` unwinds.
struct Restore(Option<SchedulerHandle>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT.with(|cell| *cell.borrow_mut() = previous);
    }
}

/// Runs `f` with `handle` installed as the current scheduler.
pub(crate) fn enter<R>(handle: SchedulerHandle, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|cell| cell.replace(Some(handle)));
    let _restore = Restore(previous);

    f()
}

/// Returns the scheduler installed for the current thread, if any.
pub fn try_current() -> Option<SchedulerHandle> {
    CURRENT.with(|cell| cell.borrow().clone())
}

/// Returns the scheduler installed for the current thread.
///
/// # Panics
///
/// Panics if called outside of a scheduler context.
pub fn current() -> SchedulerHandle {
    try_current().expect("must be called within the context of a scheduler")
}
