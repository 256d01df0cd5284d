//! # deferral
//!
//! **deferral** is a small asynchronous execution core built without any
//! compiler-generated coroutines. Every piece an `async/await` runtime needs
//! is spelled out as a plain type:
//!
//! - a **one-shot completion signal** holding a value or a failure plus a
//!   single continuation ([`CompletionSignal`]),
//! - an **awaitable** view over a signal that a computation can suspend on
//!   ([`Awaitable`]),
//! - a **task handle** that broadcasts the outcome to any number of waiters
//!   ([`TaskHandle`]),
//! - a **state machine driver** that runs a hand-written resumable
//!   computation from await point to await point ([`machine`]),
//! - a **scheduler** completing signals after a delay or when background work
//!   finishes ([`Scheduler`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deferral::machine::{self, AsyncStateMachine, MachineState, Step};
//! use deferral::{Awaitable, SchedulerHandle, TaskError};
//! use std::time::Duration;
//!
//! struct GetBar {
//!     scheduler: SchedulerHandle,
//!     delay: Option<Awaitable<()>>,
//! }
//!
//! impl AsyncStateMachine for GetBar {
//!     type Output = i32;
//!
//!     fn move_next(&mut self, state: MachineState) -> Result<Step<i32>, TaskError> {
//!         match state {
//!             MachineState::NotStarted => {
//!                 let delay = self.scheduler.after(Duration::from_millis(500));
//!                 let suspension = delay.suspend_at(0);
//!                 self.delay = Some(delay);
//!                 Ok(Step::Await(suspension))
//!             }
//!             _ => {
//!                 self.delay.take().expect("awaited at point 0").get_result()?;
//!                 Ok(Step::Complete(2))
//!             }
//!         }
//!     }
//! }
//!
//! #[deferral::main]
//! fn main() {
//!     let scheduler = deferral::scheduler::current();
//!     let bar = machine::start(GetBar { scheduler, delay: None });
//!     assert_eq!(bar.result().unwrap(), 2);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`signal`]: one-shot completion signals
//! - [`awaitable`]: suspension capability over a signal
//! - [`task`]: task handles, sources and combinators
//! - [`machine`]: state machine trait and driver
//! - [`scheduler`]: timers, dispatch workers and background threads
//! - [`time`]: delays and timeouts on the current scheduler

pub mod awaitable;
pub mod error;
pub mod machine;
pub mod scheduler;
pub mod signal;
pub mod task;
pub mod time;

pub use awaitable::Awaitable;
pub use error::{ProtocolError, TaskError, TaskResult};
pub use scheduler::{Scheduler, SchedulerBuilder, SchedulerHandle};
pub use signal::{CompletionSignal, SignalPoll};
pub use task::{TaskHandle, TaskSource, TaskStatus};

pub use deferral_macros::*;
