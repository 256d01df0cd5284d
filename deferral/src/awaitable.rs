//! Awaitable views over completion signals.
//!
//! An [`Awaitable`] is the capability a state machine needs to suspend on an
//! operation: ask whether it is ready, register the one continuation, and read
//! the outcome once resumed. It owns nothing beyond a shared reference to the
//! signal it wraps.

use crate::error::{ProtocolError, TaskError, TaskResult};
use crate::machine::Suspension;
use crate::signal::{CompletionSignal, SignalPoll};

use std::fmt;
use std::sync::Arc;
use tracing::error;

/// A pollable handle over a [`CompletionSignal`].
pub struct Awaitable<T> {
    signal: Arc<CompletionSignal<T>>,
}

impl<T> Awaitable<T> {
    /// Wraps an existing signal.
    pub fn from_signal(signal: Arc<CompletionSignal<T>>) -> Self {
        Self { signal }
    }

    /// Creates a fresh pending signal and an awaitable over it.
    ///
    /// The returned signal is the producer side; completing it readies the
    /// awaitable.
    ///
    /// Dropping every producer `Arc` without completing does not fail the
    /// awaitable. A state machine suspended on it keeps its driver alive
    /// through the registered continuation and its task stays pending. When
    /// the producer may be abandoned, await
    /// [`TaskHandle::awaitable`](crate::TaskHandle::awaitable) of a
    /// [`TaskSource`](crate::TaskSource) instead: dropping the source
    /// cancels the task, which resumes the machine with
    /// [`TaskError::Canceled`].
    pub fn pending() -> (Arc<CompletionSignal<T>>, Self) {
        let signal = Arc::new(CompletionSignal::new());
        (signal.clone(), Self { signal })
    }

    /// An awaitable that is already complete with `value`.
    pub fn ready(value: T) -> Self {
        Self::from_signal(Arc::new(CompletionSignal::completed(Ok(value))))
    }

    /// An awaitable that is already complete with `error`.
    pub fn failed(error: TaskError) -> Self {
        Self::from_signal(Arc::new(CompletionSignal::completed(Err(error))))
    }

    /// Returns `true` once the underlying signal holds an outcome.
    pub fn is_ready(&self) -> bool {
        self.signal.is_complete()
    }

    /// Registers the single continuation on the wrapped signal.
    ///
    /// Runs `continuation` inline if the signal is already complete.
    pub fn register_continuation<F>(&self, continuation: F) -> Result<(), ProtocolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.signal.on_complete(continuation)
    }
}

impl<T: Send + 'static> Awaitable<T> {
    /// Describes suspension point `point` on this awaitable.
    ///
    /// Returned from [`AsyncStateMachine::move_next`](crate::machine::AsyncStateMachine::move_next)
    /// so the driver can register itself as the continuation.
    pub fn suspend_at(&self, point: usize) -> Suspension {
        Suspension::new(point, self.signal.clone())
    }
}

impl<T: Clone> Awaitable<T> {
    /// Non-blocking read of the outcome.
    pub fn poll(&self) -> SignalPoll<T> {
        self.signal.poll()
    }

    /// Returns the stored value, or the stored failure.
    ///
    /// # Panics
    ///
    /// Panics if called before the signal completed. Drivers only call this
    /// after being resumed by the continuation.
    pub fn get_result(&self) -> TaskResult<T> {
        match self.signal.poll() {
            SignalPoll::Ready(outcome) => outcome,
            SignalPoll::Pending => {
                error!("get_result called on a pending awaitable");
                panic!("Awaitable::get_result called before completion");
            }
        }
    }
}

impl<T> Clone for Awaitable<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> fmt::Debug for Awaitable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaitable")
            .field("signal", &self.signal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_awaitable_returns_value() {
        let awaitable = Awaitable::ready("done");

        assert!(awaitable.is_ready());
        assert!(matches!(awaitable.get_result(), Ok("done")));
    }

    #[test]
    fn failed_awaitable_rethrows() {
        let awaitable = Awaitable::<u32>::failed(TaskError::TimedOut(Default::default()));
        assert!(matches!(awaitable.get_result(), Err(TaskError::TimedOut(_))));
    }

    #[test]
    fn pending_awaitable_follows_its_signal() {
        let (signal, awaitable) = Awaitable::pending();
        assert!(!awaitable.is_ready());
        assert!(matches!(awaitable.poll(), SignalPoll::Pending));

        signal.complete(3).unwrap();
        assert!(awaitable.is_ready());
        assert!(matches!(awaitable.get_result(), Ok(3)));
    }

    #[test]
    fn double_registration_fails() {
        let (_signal, awaitable) = Awaitable::<()>::pending();

        awaitable.register_continuation(|| {}).unwrap();
        assert_eq!(
            awaitable.register_continuation(|| {}),
            Err(ProtocolError::ContinuationAlreadyRegistered)
        );
    }

    #[test]
    #[should_panic(expected = "before completion")]
    fn get_result_before_completion_panics() {
        let (_signal, awaitable) = Awaitable::<u8>::pending();
        let _ = awaitable.get_result();
    }
}
