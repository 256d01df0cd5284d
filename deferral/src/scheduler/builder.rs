use super::Scheduler;

use std::thread;

/// Builder for configuring and creating a [`Scheduler`].
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .worker_threads(2)
///     .thread_name("repo")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerBuilder {
    /// Number of dispatch workers.
    pub(crate) worker_threads: usize,

    /// Prefix of every thread the scheduler spawns.
    pub(crate) thread_name: String,
}

impl SchedulerBuilder {
    /// Creates a builder with default configuration.
    ///
    /// By default, the number of dispatch workers is the number of available
    /// logical CPUs, falling back to `1`, and threads are named `deferral-*`.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: String::from("deferral"),
        }
    }

    /// Sets the number of dispatch workers running fired completions.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the name prefix of the scheduler's threads.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Starts the timer thread and the dispatch workers.
    pub fn build(self) -> Scheduler {
        Scheduler::new(self)
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
