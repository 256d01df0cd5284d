use super::Shared;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Body of a dispatch worker.
///
/// Runs jobs from the injector until shutdown. Jobs complete signals, so
/// this is where resumed state machines execute. A panicking job is logged
/// and does not take the worker down.
pub(crate) fn run(id: usize, shared: Arc<Shared>) {
    debug!(worker = id, "dispatch worker started");

    while let Some(job) = shared.injector.pop() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(worker = id, "continuation panicked on dispatch worker");
        }
    }

    debug!(worker = id, "dispatch worker stopped");
}
