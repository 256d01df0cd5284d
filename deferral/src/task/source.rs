use super::core::TaskCore;
use super::handle::TaskHandle;
use crate::error::{TaskError, TaskResult};

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// The producer side of a [`TaskHandle`].
///
/// A `TaskSource` publishes exactly one outcome: the publishing methods take
/// `self`, so a second publication cannot be expressed. Dropping the source
/// without publishing fails the task with [`TaskError::Canceled`], so no
/// waiter is ever left blocked on an abandoned producer.
pub struct TaskSource<T>
where
    T: Clone + Send + 'static,
{
    core: Arc<TaskCore<T>>,
    published: bool,
}

impl<T> TaskSource<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a pending task and the source that completes it.
    pub fn new() -> (Self, TaskHandle<T>) {
        let core = TaskCore::new();
        let handle = TaskHandle::from_core(core.clone());

        (
            Self {
                core,
                published: false,
            },
            handle,
        )
    }

    /// Returns another handle observing the same task.
    pub fn handle(&self) -> TaskHandle<T> {
        TaskHandle::from_core(self.core.clone())
    }

    /// Publishes a value.
    pub fn set_result(self, value: T) {
        self.set_outcome(Ok(value));
    }

    /// Publishes a failure.
    pub fn set_error(self, error: TaskError) {
        self.set_outcome(Err(error));
    }

    /// Publishes either outcome.
    pub fn set_outcome(mut self, outcome: TaskResult<T>) {
        self.published = true;
        self.publish(outcome);
    }

    fn publish(&self, outcome: TaskResult<T>) {
        if let Err(err) = self.core.publish(outcome) {
            error!(%err, "task source published twice");
            panic!("task source published twice: {err}");
        }
    }
}

impl<T> Drop for TaskSource<T>
where
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        if self.published || self.core.is_complete() {
            return;
        }

        debug!("task source dropped before publishing, canceling task");
        let _ = self.core.publish(Err(TaskError::Canceled));
    }
}

impl<T> fmt::Debug for TaskSource<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSource")
            .field("published", &self.published)
            .finish()
    }
}
