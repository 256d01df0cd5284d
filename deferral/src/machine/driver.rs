use super::suspension::Suspension;
use super::{AsyncStateMachine, MachineState, Step};
use crate::error::{TaskError, TaskResult};
use crate::task::{TaskHandle, TaskSource};

use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tracing::{debug, error, trace, warn};

struct DriverInner<M: AsyncStateMachine> {
    machine: M,
    source: Option<TaskSource<M::Output>>,
}

/// What to do once the driver lock is released.
enum Next<T>
where
    T: Clone + Send + 'static,
{
    Suspend(Suspension),
    Publish(TaskSource<T>, TaskResult<T>),
    Idle,
}

/// Drives an [`AsyncStateMachine`] from await point to await point.
///
/// The driver lives on the heap behind an `Arc`. When the machine suspends,
/// the registered continuation holds the only strong reference besides any
/// caller-held one, which keeps the machine's locals alive after the frame
/// that started it has returned.
///
/// `resume` is never executed concurrently for the same driver: the initial
/// start and each registered continuation are the only callers, and each
/// continuation fires exactly once. A violation of that rule is a bug and
/// panics.
pub struct Driver<M: AsyncStateMachine> {
    inner: Mutex<DriverInner<M>>,

    /// Raw [`MachineState`], readable without touching `inner`.
    state: AtomicI64,

    /// Set for the duration of a `resume`.
    running: AtomicBool,
}

impl<M: AsyncStateMachine> Driver<M> {
    /// Allocates a driver for `machine` and runs it up to its first real
    /// suspension (or to completion).
    ///
    /// Returns the driver and the handle of the task it completes.
    pub fn start(machine: M) -> (Arc<Self>, TaskHandle<M::Output>) {
        let (source, handle) = TaskSource::new();

        let driver = Arc::new(Self {
            inner: Mutex::new(DriverInner {
                machine,
                source: Some(source),
            }),
            state: AtomicI64::new(MachineState::NotStarted.as_raw()),
            running: AtomicBool::new(false),
        });

        driver.resume();
        (driver, handle)
    }

    /// Current state of the machine.
    ///
    /// Never blocks and never contends with a running `resume`.
    pub fn state(&self) -> MachineState {
        MachineState::from_raw(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: MachineState) {
        self.state.store(state.as_raw(), Ordering::Release);
    }

    /// Advances the machine from its last suspension point.
    ///
    /// Runs segments back to back while the awaited operations are already
    /// complete. Stops at the first pending one, registering a continuation
    /// that calls `resume` again, or at completion, publishing the outcome.
    pub fn resume(self: &Arc<Self>) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!("state machine resumed while a previous resume is still running");
            panic!("Driver::resume re-entered concurrently");
        }

        let next = self.run(&mut self.inner.lock());
        self.running.store(false, Ordering::Release);

        match next {
            Next::Idle => {}
            Next::Publish(source, outcome) => {
                debug!(ok = outcome.is_ok(), "state machine finished");
                source.set_outcome(outcome);
            }
            Next::Suspend(suspension) => {
                let driver = self.clone();
                let registered = suspension.register(Box::new(move || driver.resume()));

                if let Err(err) = registered {
                    error!(%err, point = suspension.point(), "failed to register continuation");
                    panic!("state machine could not suspend: {err}");
                }
            }
        }
    }

    fn run(&self, inner: &mut DriverInner<M>) -> Next<M::Output> {
        loop {
            let state = self.state();

            if state == MachineState::Finished {
                warn!("resume called on a finished state machine");
                return Next::Idle;
            }

            trace!(state = state.as_raw(), "resuming state machine");

            let machine = &mut inner.machine;
            let step = panic::catch_unwind(AssertUnwindSafe(|| machine.move_next(state)))
                .unwrap_or_else(|payload| Err(TaskError::from_panic(payload)));

            let outcome = match step {
                Ok(Step::Await(suspension)) => {
                    self.set_state(MachineState::SuspendedAt(suspension.point()));

                    if suspension.is_ready() {
                        trace!(
                            point = suspension.point(),
                            "awaited operation already complete, continuing synchronously"
                        );
                        continue;
                    }

                    trace!(point = suspension.point(), "suspending state machine");
                    return Next::Suspend(suspension);
                }
                Ok(Step::Complete(value)) => Ok(value),
                Err(err) => Err(err),
            };

            self.set_state(MachineState::Finished);

            return match inner.source.take() {
                Some(source) => Next::Publish(source, outcome),
                None => Next::Idle,
            };
        }
    }
}

impl<M: AsyncStateMachine> fmt::Debug for Driver<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("state", &self.state())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}
