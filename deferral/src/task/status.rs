use crate::error::{TaskError, TaskResult};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// No outcome has been published yet.
    Pending,

    /// The task produced a value.
    RanToCompletion,

    /// The task published a failure other than cancellation.
    Faulted,

    /// The producer went away, or the scheduler shut down, before publishing.
    Canceled,
}

impl TaskStatus {
    /// Derives the status from a published outcome.
    pub(crate) fn of<T>(outcome: &TaskResult<T>) -> Self {
        match outcome {
            Ok(_) => Self::RanToCompletion,
            Err(TaskError::Canceled) => Self::Canceled,
            Err(_) => Self::Faulted,
        }
    }

    /// Returns `true` for every status except [`TaskStatus::Pending`].
    pub fn is_completed(self) -> bool {
        self != Self::Pending
    }
}
