//! Error types shared by signals, task handles and the driver.
//!
//! Two families exist:
//! - [`TaskError`] is the failure a computation publishes. It is cloned
//!   out to every consumer of a task, so it stays cheap to clone.
//! - [`ProtocolError`] reports misuse of the one-shot signal protocol.
//!   Correct drivers and schedulers never produce one.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// Shared, type-erased error stored inside a failed task.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Outcome of a task: its value, or the failure it published.
pub type TaskResult<T> = Result<T, TaskError>;

/// Failure published by an asynchronous operation.
#[derive(thiserror::Error, Debug, Clone)]
pub enum TaskError {
    /// The computation body returned an error.
    ///
    /// The original error is kept as-is and can be recovered with
    /// [`TaskError::downcast_ref`].
    #[error("operation failed: {0}")]
    Operation(SharedError),

    /// The computation body or a background unit of work panicked.
    #[error("operation panicked: {0}")]
    Panicked(Arc<str>),

    /// The producer went away before publishing a result.
    #[error("operation was canceled")]
    Canceled,

    /// A timer raced against the operation and fired first.
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// A non-blocking read was attempted before completion.
    #[error("result is not ready yet")]
    NotReady,
}

impl TaskError {
    /// Wraps an arbitrary error as an operation failure.
    pub fn operation<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Operation(Arc::new(err))
    }

    /// Builds a [`TaskError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message: Arc<str> = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Arc::from(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Arc::from(s.as_str())
        } else {
            Arc::from("non-string panic payload")
        };

        Self::Panicked(message)
    }

    /// Returns the original operation error if it has type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Operation(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns `true` if the producer was canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Violation of the one-shot signal protocol.
///
/// These indicate a bug in whatever drives the signal.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// `complete` or `fail` was called on a signal that already holds an outcome.
    #[error("completion signal was already completed")]
    AlreadyCompleted,

    /// A second continuation was registered on the same signal.
    #[error("a continuation is already registered on this signal")]
    ContinuationAlreadyRegistered,
}
