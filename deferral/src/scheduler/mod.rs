//! Timer and background-work dispatch.
//!
//! The scheduler is what eventually completes the signals state machines
//! suspend on. It owns:
//! - a timer thread keeping armed timers in a min-heap by deadline,
//! - a pool of dispatch workers that complete fired timers, which runs the
//!   registered continuations (and so resumes state machines) off the timer
//!   thread,
//! - one dedicated thread per background unit of work.
//!
//! None of these ever block the thread that asked for a delay or a unit of
//! work; requests return an [`Awaitable`] immediately.
//!
//! [`Scheduler`] owns the threads and shuts them down when dropped.
//! [`SchedulerHandle`] is the cheap, clonable capability that state machines
//! keep in their locals.

mod builder;
mod context;
mod injector;
mod timer;
mod worker;

pub use builder::SchedulerBuilder;
pub use context::{current, try_current};

use crate::awaitable::Awaitable;
use crate::error::{TaskError, TaskResult};
use crate::time::timeout::race;
use injector::Injector;
use timer::TimerQueue;

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// Deadline offset used when `now + duration` is not representable. Such a
/// timer stays armed until shutdown cancels it.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// State shared by the scheduler, its threads and every handle.
pub(crate) struct Shared {
    name: String,
    pub(crate) timers: Mutex<TimerQueue>,
    pub(crate) timer_cv: Condvar,
    pub(crate) injector: Injector,
    shutdown: AtomicBool,
    background_seq: AtomicUsize,
}

/// Owner of the scheduler threads.
///
/// Dropping the scheduler shuts it down:
/// 1. new requests fail with [`TaskError::Canceled`],
/// 2. timers still armed are failed with [`TaskError::Canceled`],
/// 3. timers that already fired are still dispatched,
/// 4. the timer thread and the dispatch workers are joined.
///
/// Background threads are not joined; their units of work still complete
/// their signals when they finish.
pub struct Scheduler {
    handle: SchedulerHandle,
    timer: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub(crate) fn new(config: SchedulerBuilder) -> Self {
        let shared = Arc::new(Shared {
            name: config.thread_name,
            timers: Mutex::new(TimerQueue::new()),
            timer_cv: Condvar::new(),
            injector: Injector::new(),
            shutdown: AtomicBool::new(false),
            background_seq: AtomicUsize::new(0),
        });
        let handle = SchedulerHandle {
            shared: shared.clone(),
        };

        let timer = {
            let handle = handle.clone();
            let shared = shared.clone();
            spawn_thread(format!("{}-timer", shared.name), move || {
                context::enter(handle, || timer::run(shared));
            })
        };

        let workers = (0..config.worker_threads)
            .map(|id| {
                let handle = handle.clone();
                let shared = shared.clone();
                spawn_thread(format!("{}-worker-{id}", shared.name), move || {
                    context::enter(handle, || worker::run(id, shared));
                })
            })
            .collect();

        debug!(
            name = %shared.name,
            workers = config.worker_threads,
            "scheduler started"
        );

        Self {
            handle,
            timer: Some(timer),
            workers,
        }
    }

    /// Returns a clonable handle to this scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Runs `f` with this scheduler installed as the current one.
    ///
    /// Inside `f`, [`current`], [`time::delay`](crate::time::delay) and
    /// [`task::run_in_background`](crate::task::run_in_background) resolve
    /// to this scheduler.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        context::enter(self.handle(), f)
    }

    /// See [`SchedulerHandle::after`].
    pub fn after(&self, duration: Duration) -> Awaitable<()> {
        self.handle.after(duration)
    }

    /// See [`SchedulerHandle::run_in_background`].
    pub fn run_in_background<T, F>(&self, work: F) -> Awaitable<T>
    where
        T: Send + 'static,
        F: FnOnce() -> TaskResult<T> + Send + 'static,
    {
        self.handle.run_in_background(work)
    }

    /// Shuts the scheduler down and joins its threads.
    ///
    /// Called automatically on drop; calling it more than once is a no-op.
    pub fn shutdown(&mut self) {
        let shared = &self.handle.shared;
        if shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(name = %shared.name, "scheduler shutting down");

        shared.timers.lock().shutdown = true;
        shared.timer_cv.notify_all();

        if let Some(timer) = self.timer.take() {
            join_thread(timer);
        }

        shared.injector.shutdown();
        for worker in self.workers.drain(..) {
            join_thread(worker);
        }

        debug!(name = %shared.name, "scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.handle.shared.name)
            .field("workers", &self.workers.len())
            .finish()
    }
}

/// Clonable capability to request delays and background work.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Returns an awaitable that completes once `duration` has elapsed.
    ///
    /// The timer fires on the timer thread and the signal is completed on a
    /// dispatch worker. A zero duration yields an awaitable that is already
    /// complete. A duration too large to form a deadline never fires. After
    /// shutdown the awaitable is already failed with [`TaskError::Canceled`].
    pub fn after(&self, duration: Duration) -> Awaitable<()> {
        if self.is_shutdown() {
            return Awaitable::failed(TaskError::Canceled);
        }

        if duration.is_zero() {
            return Awaitable::ready(());
        }

        let now = Instant::now();
        let deadline = now
            .checked_add(duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let (signal, awaitable) = Awaitable::pending();

        let earliest = {
            let mut timers = self.shared.timers.lock();
            if timers.shutdown {
                return Awaitable::failed(TaskError::Canceled);
            }
            timers.arm(deadline, signal)
        };

        trace!(?duration, earliest, "timer armed");

        if earliest {
            self.shared.timer_cv.notify_one();
        }

        awaitable
    }

    /// Runs `work` on a dedicated background thread.
    ///
    /// The returned awaitable completes with whatever `work` returns. A panic
    /// inside `work` is caught and stored as [`TaskError::Panicked`]. The
    /// background thread runs with this scheduler installed as current.
    pub fn run_in_background<T, F>(&self, work: F) -> Awaitable<T>
    where
        T: Send + 'static,
        F: FnOnce() -> TaskResult<T> + Send + 'static,
    {
        if self.is_shutdown() {
            return Awaitable::failed(TaskError::Canceled);
        }

        let id = self.shared.background_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-background-{id}", self.shared.name);
        let (signal, awaitable) = Awaitable::pending();
        let handle = self.clone();

        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            context::enter(handle, || {
                trace!("background work started");

                let outcome = panic::catch_unwind(AssertUnwindSafe(work))
                    .unwrap_or_else(|payload| Err(TaskError::from_panic(payload)));

                trace!(ok = outcome.is_ok(), "background work finished");

                if signal.publish(outcome).is_err() {
                    error!("background work completed an already completed signal");
                }
            });
        });

        match spawned {
            Ok(_) => {
                debug!(thread = %name, "background thread spawned");
                awaitable
            }
            Err(err) => {
                error!(%err, "failed to spawn background thread");
                Awaitable::failed(TaskError::operation(err))
            }
        }
    }

    /// Races `target` against a timer of `duration`.
    ///
    /// The result completes with the target's outcome if it finishes first,
    /// and with [`TaskError::TimedOut`] otherwise. Consumes the target's
    /// continuation slot.
    pub fn timeout<T>(&self, duration: Duration, target: Awaitable<T>) -> Awaitable<T>
    where
        T: Clone + Send + 'static,
    {
        race(target, self.after(duration), duration)
    }

    /// Returns `true` once the owning [`Scheduler`] started shutting down.
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Name prefix of the scheduler's threads.
    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("name", &self.shared.name)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

fn spawn_thread(name: String, f: impl FnOnce() + Send + 'static) -> JoinHandle<()> {
    thread::Builder::new()
        .name(name)
        .spawn(f)
        .expect("failed to spawn scheduler thread")
}

fn join_thread(handle: JoinHandle<()>) {
    if handle.thread().id() == thread::current().id() {
        return;
    }

    if handle.join().is_err() {
        error!("scheduler thread panicked");
    }
}
