//! A hand-written state machine awaiting a three second delay.
//!
//! Polls the task once right after starting it, then blocks on the result.

use deferral::machine::{AsyncStateMachine, Driver, MachineState, Step};
use deferral::{Awaitable, SchedulerHandle, SignalPoll, TaskError};
use std::time::{Duration, Instant};

struct GetAsync {
    scheduler: SchedulerHandle,
    delay: Option<Awaitable<()>>,
}

impl AsyncStateMachine for GetAsync {
    type Output = String;

    fn move_next(&mut self, state: MachineState) -> Result<Step<String>, TaskError> {
        println!("move_next in state {}", state.as_raw());

        match state {
            MachineState::NotStarted => {
                let delay = self.scheduler.after(Duration::from_millis(3000));
                let suspension = delay.suspend_at(0);
                self.delay = Some(delay);
                Ok(Step::Await(suspension))
            }
            MachineState::SuspendedAt(0) => {
                if let Some(delay) = self.delay.take() {
                    delay.get_result()?;
                }
                Ok(Step::Complete(String::from("async result")))
            }
            state => unreachable!("GetAsync resumed in {state:?}"),
        }
    }
}

#[deferral::main(worker_threads = 1)]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let start = Instant::now();
    let (driver, handle) = Driver::start(GetAsync {
        scheduler: deferral::scheduler::current(),
        delay: None,
    });

    match handle.poll() {
        SignalPoll::Ready(outcome) => println!("lucky, already done: {outcome:?}"),
        SignalPoll::Pending => println!("pending, machine in state {}", driver.state().as_raw()),
    }

    match handle.result() {
        Ok(value) => println!("{value} after {:?}", start.elapsed()),
        Err(err) => eprintln!("failed: {err}"),
    }

    println!("final state {}", driver.state().as_raw());
}
