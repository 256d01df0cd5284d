use crate::error::ProtocolError;
use crate::signal::{CompletionSignal, Continuation};

use std::fmt;
use std::sync::Arc;

/// Type-erased view of a signal the driver can suspend on.
pub(crate) trait Suspendable: Send + Sync {
    fn is_ready(&self) -> bool;

    fn register(&self, continuation: Continuation) -> Result<(), ProtocolError>;
}

impl<T: Send + 'static> Suspendable for CompletionSignal<T> {
    fn is_ready(&self) -> bool {
        self.is_complete()
    }

    fn register(&self, continuation: Continuation) -> Result<(), ProtocolError> {
        self.on_complete(continuation)
    }
}

/// An await point reached by a state machine.
///
/// Built with [`Awaitable::suspend_at`](crate::awaitable::Awaitable::suspend_at).
/// Carries the index of the await point and the signal to resume on.
pub struct Suspension {
    point: usize,
    target: Arc<dyn Suspendable>,
}

impl Suspension {
    pub(crate) fn new<T: Send + 'static>(point: usize, signal: Arc<CompletionSignal<T>>) -> Self {
        Self {
            point,
            target: signal,
        }
    }

    /// Index of the await point, starting at `0`.
    pub fn point(&self) -> usize {
        self.point
    }

    /// Returns `true` if the awaited operation already completed.
    pub fn is_ready(&self) -> bool {
        self.target.is_ready()
    }

    pub(crate) fn register(&self, continuation: Continuation) -> Result<(), ProtocolError> {
        self.target.register(continuation)
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("point", &self.point)
            .field("ready", &self.is_ready())
            .finish()
    }
}
