use super::Shared;
use crate::error::TaskError;
use crate::signal::CompletionSignal;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// An armed timer waiting in the timer queue.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Arming order, used to fire timers with equal deadlines FIFO.
    pub(crate) seq: u64,

    /// Signal completed when the deadline is reached.
    pub(crate) signal: Arc<CompletionSignal<()>>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed so that `BinaryHeap<TimerEntry>` pops the earliest deadline
    /// first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Timers guarded by the scheduler's timer lock.
pub(crate) struct TimerQueue {
    pub(crate) heap: BinaryHeap<TimerEntry>,
    pub(crate) next_seq: u64,
    pub(crate) shutdown: bool,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            shutdown: false,
        }
    }

    /// Arms a timer. Returns `true` if it is now the earliest one.
    pub(crate) fn arm(&mut self, deadline: Instant, signal: Arc<CompletionSignal<()>>) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;

        let earliest = self.heap.peek().is_none_or(|top| deadline < top.deadline);
        self.heap.push(TimerEntry {
            deadline,
            seq,
            signal,
        });
        earliest
    }

    /// Pops every timer whose deadline is at or before `now`.
    fn pop_due(&mut self, now: Instant) -> Vec<Arc<CompletionSignal<()>>> {
        let mut due = Vec::new();

        while self.heap.peek().is_some_and(|top| top.deadline <= now) {
            if let Some(entry) = self.heap.pop() {
                due.push(entry.signal);
            }
        }
        due
    }
}

/// Body of the timer thread.
///
/// Sleeps until the earliest deadline, then hands every due timer to the
/// dispatch workers, which complete its signal. On shutdown, timers still
/// armed are handed to the workers too, which fail them with
/// [`TaskError::Canceled`]. The workers are still running at that point;
/// the scheduler stops them only after this thread has returned.
pub(crate) fn run(shared: Arc<Shared>) {
    debug!("timer thread started");

    let mut timers = shared.timers.lock();

    loop {
        if timers.shutdown {
            break;
        }

        let due = timers.pop_due(Instant::now());
        if !due.is_empty() {
            trace!(count = due.len(), "timers due");
            for signal in due {
                shared.injector.push(Box::new(move || fire(&signal)));
            }
            continue;
        }

        match timers.heap.peek().map(|entry| entry.deadline) {
            Some(deadline) => {
                shared.timer_cv.wait_until(&mut timers, deadline);
            }
            None => shared.timer_cv.wait(&mut timers),
        }
    }

    let canceled: Vec<_> = timers.heap.drain().map(|entry| entry.signal).collect();
    drop(timers);

    if !canceled.is_empty() {
        debug!(count = canceled.len(), "canceling timers still armed at shutdown");
    }
    for signal in canceled {
        shared.injector.push(Box::new(move || cancel(&signal)));
    }

    debug!("timer thread stopped");
}

fn fire(signal: &CompletionSignal<()>) {
    if signal.complete(()).is_err() {
        warn!("timer fired on an already completed signal");
    }
}

fn cancel(signal: &CompletionSignal<()>) {
    if signal.fail(TaskError::Canceled).is_err() {
        warn!("canceled timer was already completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn signal() -> Arc<CompletionSignal<()>> {
        Arc::new(CompletionSignal::new())
    }

    #[test]
    fn heap_pops_earliest_deadline_first() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();

        queue.arm(now + Duration::from_millis(30), signal());
        queue.arm(now + Duration::from_millis(10), signal());
        queue.arm(now + Duration::from_millis(20), signal());

        let order: Vec<_> = std::iter::from_fn(|| queue.heap.pop())
            .map(|entry| entry.deadline - now)
            .collect();

        assert_eq!(
            order,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(30),
            ]
        );
    }

    #[test]
    fn equal_deadlines_keep_arming_order() {
        let deadline = Instant::now();
        let mut queue = TimerQueue::new();

        queue.arm(deadline, signal());
        queue.arm(deadline, signal());

        assert_eq!(queue.heap.pop().map(|e| e.seq), Some(0));
        assert_eq!(queue.heap.pop().map(|e| e.seq), Some(1));
    }

    #[test]
    fn arm_reports_new_earliest() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();

        assert!(queue.arm(now + Duration::from_millis(50), signal()));
        assert!(!queue.arm(now + Duration::from_millis(80), signal()));
        assert!(queue.arm(now + Duration::from_millis(5), signal()));
    }

    #[test]
    fn pop_due_leaves_future_timers() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();

        queue.arm(now, signal());
        queue.arm(now + Duration::from_secs(60), signal());

        assert_eq!(queue.pop_due(now).len(), 1);
        assert_eq!(queue.heap.len(), 1);
    }
}
