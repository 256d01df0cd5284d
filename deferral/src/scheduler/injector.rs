use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// A unit of dispatch: usually "complete this signal", which in turn runs
/// whatever continuation is registered on it.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared FIFO queue feeding the dispatch workers.
///
/// Workers block on the condition variable while the queue is empty. After
/// shutdown they keep draining until the queue is empty, so every job
/// pushed before shutdown still runs.
pub(crate) struct Injector {
    queue: Mutex<VecDeque<Job>>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Pushes a job and wakes one parked worker.
    pub(crate) fn push(&self, job: Job) {
        self.queue.lock().push_back(job);
        self.condvar.notify_one();
    }

    /// Blocks until a job is available.
    ///
    /// Returns `None` only once shutdown was requested and the queue is empty.
    pub(crate) fn pop(&self) -> Option<Job> {
        let mut queue = self.queue.lock();

        loop {
            if let Some(job) = queue.pop_front() {
                return Some(job);
            }

            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }

            self.condvar.wait(&mut queue);
        }
    }

    /// Signals shutdown and wakes every parked worker.
    pub(crate) fn shutdown(&self) {
        let _queue = self.queue.lock();
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
    }
}
