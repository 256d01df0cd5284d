//! Hand-written resumable computations.
//!
//! An async-style operation is written as an explicit state machine: a
//! struct holding the locals that must survive a suspension, and a
//! [`move_next`](AsyncStateMachine::move_next) method that runs the segment
//! after the await point it is resumed at. The [`Driver`] owns the machine,
//! tracks its [`MachineState`] and registers itself as the continuation of
//! whatever the machine awaits.
//!
//! ```rust,ignore
//! struct GetAsync {
//!     scheduler: SchedulerHandle,
//!     delay: Option<Awaitable<()>>,
//! }
//!
//! impl AsyncStateMachine for GetAsync {
//!     type Output = String;
//!
//!     fn move_next(&mut self, state: MachineState) -> Result<Step<String>, TaskError> {
//!         match state {
//!             MachineState::NotStarted => {
//!                 let delay = self.scheduler.after(Duration::from_secs(3));
//!                 let suspension = delay.suspend_at(0);
//!                 self.delay = Some(delay);
//!                 Ok(Step::Await(suspension))
//!             }
//!             MachineState::SuspendedAt(0) => {
//!                 self.delay.take().expect("delay awaited at point 0").get_result()?;
//!                 Ok(Step::Complete("async result".to_string()))
//!             }
//!             state => unreachable!("GetAsync resumed in {state:?}"),
//!         }
//!     }
//! }
//!
//! let handle = machine::start(GetAsync { scheduler, delay: None });
//! ```

mod driver;
mod suspension;

pub use driver::Driver;
pub use suspension::Suspension;

use crate::error::TaskError;
use crate::task::TaskHandle;

/// Position of a state machine in its computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineState {
    /// `move_next` has not run yet.
    NotStarted,

    /// Suspended after reaching await point `k`; the next `move_next`
    /// resumes right after it.
    SuspendedAt(usize),

    /// The outcome has been published.
    Finished,
}

impl MachineState {
    /// Integer encoding: `-1` not started, `k` suspended at `k`, `-2` finished.
    pub fn as_raw(self) -> i64 {
        match self {
            Self::NotStarted => -1,
            Self::SuspendedAt(k) => k as i64,
            Self::Finished => -2,
        }
    }

    pub(crate) fn from_raw(raw: i64) -> Self {
        match raw {
            -1 => Self::NotStarted,
            -2 => Self::Finished,
            k => Self::SuspendedAt(k as usize),
        }
    }
}

/// What a single `move_next` call reached.
#[derive(Debug)]
pub enum Step<T> {
    /// An await point. The driver resumes the machine once it completes.
    Await(Suspension),

    /// The end of the computation, with its value.
    Complete(T),
}

/// A computation split into segments between await points.
pub trait AsyncStateMachine: Send + 'static {
    /// Value published on successful completion.
    type Output: Clone + Send + 'static;

    /// Runs the segment following `state`.
    ///
    /// Returning `Err`, or panicking, publishes that failure and finishes the
    /// machine; no partial result is ever published.
    fn move_next(&mut self, state: MachineState) -> Result<Step<Self::Output>, TaskError>;
}

/// Starts `machine` and returns the handle of the task it completes.
///
/// Runs synchronously up to the first await point that is not yet complete,
/// then returns. The handle stays [`Pending`](crate::task::TaskStatus::Pending)
/// until a continuation finishes the machine.
pub fn start<M: AsyncStateMachine>(machine: M) -> TaskHandle<M::Output> {
    let (_driver, handle) = Driver::start(machine);
    handle
}
