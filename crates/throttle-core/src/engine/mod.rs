//! Engine - admission, queueing and timeouts.
//!
//! # Components
//! - **Throttle**: public handle; `submit`, `status`
//! - **ThrottleState**: running set, FIFO waiting queue, admission check
//! - **TpsCounter**: admissions per calendar second
//! - **Timer**: owned one-shot deadline
//! - **CatchPanic**: turns a panicking operation into a failed task
//! - **Completion**: the submitter's side of a task

mod completion;
mod rate;
mod record;
mod state;
mod throttle;
mod timer;
mod unwind;

pub use self::completion::Completion;
pub use self::rate::TpsCounter;
pub use self::state::Admission;
pub use self::throttle::Throttle;
