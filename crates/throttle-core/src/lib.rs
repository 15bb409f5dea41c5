//! throttle-core
//!
//! In-process admission control for async operations: a concurrency limit,
//! an optional per-second admission limit, a FIFO waiting queue and per-phase
//! timeouts.
//!
//! # Modules
//! - **domain**: ids, task lifecycle, error taxonomy, options, status snapshot
//! - **ports**: clock and ticket generation seams
//! - **engine**: the throttle itself
//! - **app**: builder

pub mod app;
pub mod domain;
pub mod engine;
pub mod ports;

pub use app::{BuildError, ThrottleBuilder};
pub use domain::{TaskState, ThrottleError, ThrottleOptions, ThrottleStatus, TicketId};
pub use engine::{Completion, Throttle};
