use super::{TaskHandle, TaskSource, from_result};
use crate::error::TaskResult;

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Combines already-started tasks into one task yielding all of their values.
///
/// The combined task completes once every input has completed. Values keep
/// the order of `handles`, not the order of completion. If any input failed,
/// the combined task fails with the first failure in argument order.
pub fn when_all<T>(handles: Vec<TaskHandle<T>>) -> TaskHandle<Vec<T>>
where
    T: Clone + Send + 'static,
{
    if handles.is_empty() {
        return from_result(Vec::new());
    }

    let (source, combined) = TaskSource::new();
    let state = Arc::new(WhenAll {
        remaining: AtomicUsize::new(handles.len()),
        handles: handles.clone(),
        source: Mutex::new(Some(source)),
    });

    for handle in &handles {
        let state = state.clone();
        handle.on_complete(move |_| state.finish_one());
    }

    combined
}

struct WhenAll<T>
where
    T: Clone + Send + 'static,
{
    remaining: AtomicUsize,
    handles: Vec<TaskHandle<T>>,
    source: Mutex<Option<TaskSource<Vec<T>>>>,
}

impl<T> WhenAll<T>
where
    T: Clone + Send + 'static,
{
    fn finish_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        let Some(source) = self.source.lock().take() else {
            return;
        };

        let outcome = self
            .handles
            .iter()
            .map(TaskHandle::try_result)
            .collect::<TaskResult<Vec<T>>>();

        source.set_outcome(outcome);
    }
}
