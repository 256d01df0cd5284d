use deferral::machine::{self, AsyncStateMachine, MachineState, Step};
use deferral::task::{self, when_all};
use deferral::{Awaitable, SchedulerBuilder, SchedulerHandle, TaskError, TaskHandle};
use std::time::{Duration, Instant};

/// Produces `value` after `delay`.
struct Delayed {
    scheduler: SchedulerHandle,
    delay: Duration,
    value: i32,
    timer: Option<Awaitable<()>>,
}

impl AsyncStateMachine for Delayed {
    type Output = i32;

    fn move_next(&mut self, state: MachineState) -> Result<Step<i32>, TaskError> {
        match state {
            MachineState::NotStarted => {
                let timer = self.scheduler.after(self.delay);
                let suspension = timer.suspend_at(0);
                self.timer = Some(timer);
                Ok(Step::Await(suspension))
            }
            MachineState::SuspendedAt(0) => {
                if let Some(timer) = self.timer.take() {
                    timer.get_result()?;
                }
                Ok(Step::Complete(self.value))
            }
            state => unreachable!("Delayed resumed in {state:?}"),
        }
    }
}

fn get_foo(scheduler: &SchedulerHandle) -> TaskHandle<i32> {
    delayed(scheduler, Duration::from_millis(1000), 1)
}

fn get_bar(scheduler: &SchedulerHandle) -> TaskHandle<i32> {
    delayed(scheduler, Duration::from_millis(500), 2)
}

fn delayed(scheduler: &SchedulerHandle, delay: Duration, value: i32) -> TaskHandle<i32> {
    machine::start(Delayed {
        scheduler: scheduler.clone(),
        delay,
        value,
        timer: None,
    })
}

/// Starts foo and bar eagerly, then awaits bar before foo.
struct SumFooBar {
    scheduler: SchedulerHandle,
    foo: Option<Awaitable<i32>>,
    bar: Option<Awaitable<i32>>,
    bar_value: i32,
}

impl SumFooBar {
    fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            scheduler,
            foo: None,
            bar: None,
            bar_value: 0,
        }
    }
}

impl AsyncStateMachine for SumFooBar {
    type Output = i32;

    fn move_next(&mut self, state: MachineState) -> Result<Step<i32>, TaskError> {
        match state {
            MachineState::NotStarted => {
                let foo = get_foo(&self.scheduler).awaitable();
                let bar = get_bar(&self.scheduler).awaitable();
                let suspension = bar.suspend_at(0);
                self.foo = Some(foo);
                self.bar = Some(bar);
                Ok(Step::Await(suspension))
            }
            MachineState::SuspendedAt(0) => {
                if let Some(bar) = self.bar.take() {
                    self.bar_value = bar.get_result()?;
                }
                match &self.foo {
                    Some(foo) => Ok(Step::Await(foo.suspend_at(1))),
                    None => unreachable!("foo started at NotStarted"),
                }
            }
            MachineState::SuspendedAt(1) => {
                let foo = match self.foo.take() {
                    Some(foo) => foo.get_result()?,
                    None => unreachable!("foo started at NotStarted"),
                };
                Ok(Step::Complete(foo + self.bar_value))
            }
            state => unreachable!("SumFooBar resumed in {state:?}"),
        }
    }
}

#[test]
fn eager_start_runs_operations_concurrently() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build();
    let start = Instant::now();

    let sum = machine::start(SumFooBar::new(scheduler.handle()));
    assert!(!sum.is_completed());

    assert_eq!(sum.result().unwrap(), 3);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "finished too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "operations ran sequentially: {elapsed:?}");
}

#[test]
fn waiting_order_does_not_change_results() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build();
    let handle = scheduler.handle();

    let foo = get_foo(&handle);
    let bar = get_bar(&handle);
    let first = (foo.result().unwrap(), bar.result().unwrap());

    let foo = get_foo(&handle);
    let bar = get_bar(&handle);
    let bar_value = bar.result().unwrap();
    let second = (foo.result().unwrap(), bar_value);

    assert_eq!(first, (1, 2));
    assert_eq!(first, second);
}

#[test]
fn join_waits_on_all_handles() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build();
    let handle = scheduler.handle();
    let start = Instant::now();

    let (foo, bar) = deferral::join!(get_foo(&handle), get_bar(&handle)).unwrap();

    assert_eq!(foo + bar, 3);
    assert!(start.elapsed() < Duration::from_millis(1500));
}

#[test]
fn join_surfaces_the_first_failure() {
    let failing = task::from_error::<i32>(TaskError::Canceled);
    let fine = task::from_result(7);

    let joined = deferral::join!(fine, failing);

    assert!(joined.unwrap_err().is_canceled());
}

#[test]
fn when_all_keeps_argument_order() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build();
    let handle = scheduler.handle();

    let all = when_all(vec![
        delayed(&handle, Duration::from_millis(60), 1),
        delayed(&handle, Duration::from_millis(10), 2),
        delayed(&handle, Duration::from_millis(30), 3),
    ]);

    assert_eq!(all.result().unwrap(), vec![1, 2, 3]);
}

#[deferral::test(worker_threads = 2)]
fn handles_compose_inside_a_scheduler_context() {
    let scheduler = deferral::scheduler::current();

    let foo = get_foo(&scheduler);
    let bar = get_bar(&scheduler);

    assert_eq!(bar.result().unwrap() + foo.result().unwrap(), 3);
}
