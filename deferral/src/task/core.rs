use crate::error::{ProtocolError, TaskResult};
use crate::signal::{CompletionSignal, SignalPoll};

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::task::Waker;
use std::time::{Duration, Instant};
use tracing::trace;

type Callback<T> = Box<dyn FnOnce(TaskResult<T>) + Send + 'static>;

/// Everything registered against a task before it finished.
struct Waiters<T> {
    /// Set once the fan-out has run. Guarded by the same lock as the lists
    /// so a late subscriber can never miss it.
    finished: bool,
    callbacks: Vec<Callback<T>>,
    wakers: Vec<Waker>,
}

/// Shared state behind a task's source and all of its handles.
///
/// The raw [`CompletionSignal`] only has one continuation slot. The core
/// claims that slot for itself at construction and fans the outcome out to
/// any number of callbacks, blocked threads and wakers.
pub(crate) struct TaskCore<T> {
    signal: CompletionSignal<T>,
    waiters: Mutex<Waiters<T>>,
    done: Condvar,
}

impl<T> TaskCore<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new() -> Arc<Self> {
        let core = Arc::new(Self {
            signal: CompletionSignal::new(),
            waiters: Mutex::new(Waiters {
                finished: false,
                callbacks: Vec::new(),
                wakers: Vec::new(),
            }),
            done: Condvar::new(),
        });

        let weak = Arc::downgrade(&core);
        core.signal
            .on_complete(move || {
                if let Some(core) = weak.upgrade() {
                    core.fan_out();
                }
            })
            .expect("fresh signal has an empty continuation slot");

        core
    }

    pub(crate) fn publish(&self, outcome: TaskResult<T>) -> Result<(), ProtocolError> {
        self.signal.publish(outcome)
    }

    pub(crate) fn poll(&self) -> SignalPoll<T> {
        self.signal.poll()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.signal.is_complete()
    }

    fn fan_out(&self) {
        let SignalPoll::Ready(outcome) = self.signal.poll() else {
            return;
        };

        let (callbacks, wakers) = {
            let mut waiters = self.waiters.lock();
            waiters.finished = true;
            (
                std::mem::take(&mut waiters.callbacks),
                std::mem::take(&mut waiters.wakers),
            )
        };

        trace!(
            callbacks = callbacks.len(),
            wakers = wakers.len(),
            "task finished, notifying waiters"
        );

        self.done.notify_all();

        for callback in callbacks {
            callback(outcome.clone());
        }

        for waker in wakers {
            waker.wake();
        }
    }

    /// Runs `callback` with the outcome once the task finishes, or right away
    /// if it already has.
    pub(crate) fn subscribe(&self, callback: Callback<T>) {
        {
            let mut waiters = self.waiters.lock();
            if !waiters.finished {
                waiters.callbacks.push(callback);
                return;
            }
        }

        if let SignalPoll::Ready(outcome) = self.signal.poll() {
            callback(outcome);
        }
    }

    /// Stores `waker` unless the task already finished.
    pub(crate) fn register_waker(&self, waker: &Waker) {
        let mut waiters = self.waiters.lock();
        if !waiters.finished && !waiters.wakers.iter().any(|w| w.will_wake(waker)) {
            waiters.wakers.push(waker.clone());
        }
    }

    pub(crate) fn wait(&self) {
        let mut waiters = self.waiters.lock();
        while !waiters.finished {
            self.done.wait(&mut waiters);
        }
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut waiters = self.waiters.lock();

        while !waiters.finished {
            if self.done.wait_until(&mut waiters, deadline).timed_out() {
                return waiters.finished;
            }
        }
        true
    }
}
