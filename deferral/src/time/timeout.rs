use crate::awaitable::Awaitable;
use crate::error::{TaskError, TaskResult};
use crate::signal::CompletionSignal;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Completes the returned awaitable with whichever of `target` and `timer`
/// finishes first.
///
/// The target is registered first, so a target that is already complete
/// wins over a zero-length timer. A timer that fails (the scheduler shut
/// down) does not settle the race.
pub(crate) fn race<T>(target: Awaitable<T>, timer: Awaitable<()>, duration: Duration) -> Awaitable<T>
where
    T: Clone + Send + 'static,
{
    let (out, raced) = Awaitable::pending();

    {
        let out = out.clone();
        let observed = target.clone();
        let registered = target.register_continuation(move || {
            settle(&out, observed.get_result());
        });

        if let Err(err) = registered {
            return Awaitable::failed(TaskError::operation(err));
        }
    }

    let observed = timer.clone();
    let registered = timer.register_continuation(move || {
        if observed.get_result().is_ok() {
            debug!(?duration, "timeout elapsed before the operation completed");
            settle(&out, Err(TaskError::TimedOut(duration)));
        }
    });

    if registered.is_err() {
        trace!("timer already observed, racing on the target alone");
    }

    raced
}

fn settle<T>(out: &Arc<CompletionSignal<T>>, outcome: TaskResult<T>) {
    if out.publish(outcome).is_err() {
        trace!("race already settled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_first_wins() {
        let (target_signal, target) = Awaitable::pending();
        let (timer_signal, timer) = Awaitable::pending();
        let raced = race(target, timer, Duration::from_millis(10));

        target_signal.complete(7).unwrap();
        timer_signal.complete(()).unwrap();

        assert!(matches!(raced.get_result(), Ok(7)));
    }

    #[test]
    fn timer_first_times_out() {
        let (target_signal, target) = Awaitable::<u8>::pending();
        let (timer_signal, timer) = Awaitable::pending();
        let raced = race(target, timer, Duration::from_millis(10));

        timer_signal.complete(()).unwrap();
        assert!(matches!(raced.get_result(), Err(TaskError::TimedOut(d)) if d == Duration::from_millis(10)));

        target_signal.complete(1).unwrap();
        assert!(matches!(raced.get_result(), Err(TaskError::TimedOut(_))));
    }

    #[test]
    fn completed_target_beats_ready_timer() {
        let raced = race(Awaitable::ready("fast"), Awaitable::ready(()), Duration::ZERO);
        assert!(matches!(raced.get_result(), Ok("fast")));
    }

    #[test]
    fn canceled_timer_does_not_settle() {
        let (target_signal, target) = Awaitable::pending();
        let raced = race(target, Awaitable::failed(TaskError::Canceled), Duration::from_secs(1));

        assert!(!raced.is_ready());
        target_signal.complete(3).unwrap();
        assert!(matches!(raced.get_result(), Ok(3)));
    }
}
