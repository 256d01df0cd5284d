use deferral::{Awaitable, SchedulerBuilder, TaskError, TaskSource, time};
use std::time::Duration;

fn wait_for<T: Send + 'static>(awaitable: &Awaitable<T>) {
    let (source, handle) = TaskSource::new();
    awaitable
        .register_continuation(move || source.set_result(()))
        .unwrap();
    handle.wait();
}

#[deferral::test]
fn timeout_elapses_before_target() {
    let slow = time::delay(Duration::from_secs(5));
    let bounded = time::timeout(Duration::from_millis(20), slow);

    wait_for(&bounded);

    assert!(matches!(
        bounded.get_result(),
        Err(TaskError::TimedOut(d)) if d == Duration::from_millis(20)
    ));
}

#[deferral::test]
fn target_finishes_before_timeout() {
    let fast = time::delay(Duration::from_millis(10));
    let bounded = time::timeout(Duration::from_secs(5), fast);

    wait_for(&bounded);

    assert!(bounded.get_result().is_ok());
}

#[test]
fn target_failure_wins_over_timeout() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build();
    let (signal, target) = Awaitable::<u8>::pending();

    let bounded = scheduler.handle().timeout(Duration::from_secs(5), target);
    signal.fail(TaskError::Canceled).unwrap();

    assert!(bounded.get_result().unwrap_err().is_canceled());
}

#[test]
fn ready_target_completes_immediately() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build();

    let bounded = scheduler
        .handle()
        .timeout(Duration::from_millis(1), Awaitable::ready(9));

    assert_eq!(bounded.get_result().unwrap(), 9);
}
