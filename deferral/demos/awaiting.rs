//! Starts two delayed operations before waiting on either.
//!
//! `foo` takes one second and `bar` half a second. Waiting on `bar` first
//! and `foo` second still finishes in about one second.

use deferral::machine::{self, AsyncStateMachine, MachineState, Step};
use deferral::{Awaitable, SchedulerHandle, TaskError, TaskHandle};
use std::time::{Duration, Instant};

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
            _ => {
                if let Some(timer) = self.timer.take() {
                    timer.get_result()?;
                }
                Ok(Step::Complete(self.value))
            }
        }
    }
}

fn get(scheduler: &SchedulerHandle, millis: u64, value: i32) -> TaskHandle<i32> {
    machine::start(Delayed {
        scheduler: scheduler.clone(),
        delay: Duration::from_millis(millis),
        value,
        timer: None,
    })
}

#[deferral::main]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scheduler = deferral::scheduler::current();
    let start = Instant::now();

    let foo = get(&scheduler, 1000, 1);
    let bar = get(&scheduler, 500, 2);

    let sum = bar.result().and_then(|bar| Ok(bar + foo.result()?));

    match sum {
        Ok(sum) => println!("foo + bar = {sum} in {:?}", start.elapsed()),
        Err(err) => eprintln!("failed: {err}"),
    }
}
