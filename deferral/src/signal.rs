//! One-shot completion signals.
//!
//! A [`CompletionSignal`] is the only object shared between the worker that
//! finishes a unit of work and the consumer waiting for it. It holds:
//! - the outcome slot (empty, value, or failure),
//! - a single continuation slot.
//!
//! Both slots live behind one lock, so the race between "the operation
//! finishes first" and "the consumer registers first" always resolves to
//! exactly one continuation invocation. The continuation itself always runs
//! after the lock is released.

use crate::error::{ProtocolError, TaskError, TaskResult};

use parking_lot::Mutex;
use std::fmt;
use tracing::trace;

/// Callback invoked once a signal holds its outcome.
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Result of a non-blocking [`CompletionSignal::poll`].
#[derive(Debug, Clone)]
pub enum SignalPoll<T> {
    /// No outcome yet.
    Pending,

    /// The outcome is available.
    Ready(TaskResult<T>),
}

impl<T> SignalPoll<T> {
    /// Returns `true` for [`SignalPoll::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

enum ContinuationSlot {
    Empty,
    Registered(Continuation),
    Fired,
}

struct SignalState<T> {
    outcome: Option<TaskResult<T>>,
    continuation: ContinuationSlot,
}

/// A one-shot, thread-safe outcome slot with a single continuation.
pub struct CompletionSignal<T> {
    state: Mutex<SignalState<T>>,
}

impl<T> CompletionSignal<T> {
    /// Creates an empty signal.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SignalState {
                outcome: None,
                continuation: ContinuationSlot::Empty,
            }),
        }
    }

    /// Creates a signal that already holds `outcome`.
    pub fn completed(outcome: TaskResult<T>) -> Self {
        Self {
            state: Mutex::new(SignalState {
                outcome: Some(outcome),
                continuation: ContinuationSlot::Empty,
            }),
        }
    }

    /// Stores a successful value.
    ///
    /// Fails with [`ProtocolError::AlreadyCompleted`] if an outcome is
    /// already present. A registered continuation runs on the calling
    /// thread once the value is visible to every poller.
    pub fn complete(&self, value: T) -> Result<(), ProtocolError> {
        self.publish(Ok(value))
    }

    /// Stores a failure. Same one-shot contract as [`complete`](Self::complete).
    pub fn fail(&self, error: TaskError) -> Result<(), ProtocolError> {
        self.publish(Err(error))
    }

    /// Stores either outcome.
    pub fn publish(&self, outcome: TaskResult<T>) -> Result<(), ProtocolError> {
        let continuation = {
            let mut state = self.state.lock();

            if state.outcome.is_some() {
                return Err(ProtocolError::AlreadyCompleted);
            }

            trace!(ok = outcome.is_ok(), "completion signal published");
            state.outcome = Some(outcome);

            match std::mem::replace(&mut state.continuation, ContinuationSlot::Fired) {
                ContinuationSlot::Registered(continuation) => Some(continuation),
                ContinuationSlot::Empty => {
                    state.continuation = ContinuationSlot::Empty;
                    None
                }
                ContinuationSlot::Fired => None,
            }
        };

        if let Some(continuation) = continuation {
            continuation();
        }

        Ok(())
    }

    /// Registers the single continuation.
    ///
    /// If the signal is already complete the continuation runs immediately on
    /// the calling thread, before this method returns. A second registration
    /// fails with [`ProtocolError::ContinuationAlreadyRegistered`].
    pub fn on_complete<F>(&self, continuation: F) -> Result<(), ProtocolError>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.state.lock();

            if !matches!(state.continuation, ContinuationSlot::Empty) {
                return Err(ProtocolError::ContinuationAlreadyRegistered);
            }

            if state.outcome.is_none() {
                trace!("continuation registered on pending signal");
                state.continuation = ContinuationSlot::Registered(Box::new(continuation));
                return Ok(());
            }

            state.continuation = ContinuationSlot::Fired;
        }

        trace!("continuation registered on completed signal, running inline");
        continuation();
        Ok(())
    }

    /// Returns `true` once an outcome has been stored.
    pub fn is_complete(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    /// Returns `true` if the stored outcome is a failure.
    pub fn is_failed(&self) -> bool {
        matches!(self.state.lock().outcome, Some(Err(_)))
    }
}

impl<T: Clone> CompletionSignal<T> {
    /// Non-blocking read of the outcome. Safe to call repeatedly.
    pub fn poll(&self) -> SignalPoll<T> {
        match &self.state.lock().outcome {
            Some(outcome) => SignalPoll::Ready(outcome.clone()),
            None => SignalPoll::Pending,
        }
    }
}

impl<T> Default for CompletionSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CompletionSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let outcome = match &state.outcome {
            None => "pending",
            Some(Ok(_)) => "ok",
            Some(Err(_)) => "failed",
        };
        let continuation = match state.continuation {
            ContinuationSlot::Empty => "empty",
            ContinuationSlot::Registered(_) => "registered",
            ContinuationSlot::Fired => "fired",
        };

        f.debug_struct("CompletionSignal")
            .field("outcome", &outcome)
            .field("continuation", &continuation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn poll_reports_pending_then_value() {
        let signal = CompletionSignal::new();
        assert!(matches!(signal.poll(), SignalPoll::Pending));

        signal.complete(5).unwrap();
        assert!(matches!(signal.poll(), SignalPoll::Ready(Ok(5))));
        assert!(matches!(signal.poll(), SignalPoll::Ready(Ok(5))));
    }

    #[test]
    fn second_completion_is_rejected() {
        let signal = CompletionSignal::new();

        signal.complete("first").unwrap();
        assert_eq!(signal.complete("second"), Err(ProtocolError::AlreadyCompleted));
        assert_eq!(
            signal.fail(TaskError::Canceled),
            Err(ProtocolError::AlreadyCompleted)
        );
        assert!(matches!(signal.poll(), SignalPoll::Ready(Ok("first"))));
    }

    #[test]
    fn failure_is_stored() {
        let signal = CompletionSignal::<u8>::new();
        signal.fail(TaskError::Canceled).unwrap();

        assert!(signal.is_failed());
        assert!(matches!(signal.poll(), SignalPoll::Ready(Err(TaskError::Canceled))));
    }

    #[test]
    fn continuation_registered_first_fires_on_completion() {
        let signal = CompletionSignal::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        signal
            .on_complete(move || {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        signal.complete(()).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn continuation_registered_late_runs_inline() {
        let signal = CompletionSignal::completed(Ok(1));
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        signal
            .on_complete(move || {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_registration_is_rejected() {
        let signal = CompletionSignal::<()>::new();

        signal.on_complete(|| {}).unwrap();
        assert_eq!(
            signal.on_complete(|| {}),
            Err(ProtocolError::ContinuationAlreadyRegistered)
        );

        // Still rejected once the first one has fired.
        signal.complete(()).unwrap();
        assert_eq!(
            signal.on_complete(|| {}),
            Err(ProtocolError::ContinuationAlreadyRegistered)
        );
    }

    #[test]
    fn racing_completers_fire_continuation_once() {
        for _ in 0..50 {
            let signal = Arc::new(CompletionSignal::new());
            let fired = Arc::new(AtomicUsize::new(0));
            let wins = Arc::new(AtomicUsize::new(0));

            let f = fired.clone();
            signal
                .on_complete(move || {
                    f.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();

            let barrier = Arc::new(Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let signal = signal.clone();
                    let barrier = barrier.clone();
                    let wins = wins.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        if signal.complete(i).is_ok() {
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(wins.load(Ordering::SeqCst), 1);
            assert_eq!(fired.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn registration_racing_completion_fires_once() {
        for _ in 0..100 {
            let signal = Arc::new(CompletionSignal::new());
            let fired = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(2));

            let producer = {
                let signal = signal.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    signal.complete(()).unwrap();
                })
            };

            let f = fired.clone();
            barrier.wait();
            signal
                .on_complete(move || {
                    f.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();

            producer.join().unwrap();
            assert_eq!(fired.load(Ordering::SeqCst), 1);
        }
    }
}
