//! Task record: one submission as the engine sees it.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use super::timer::Timer;
use crate::domain::{TaskState, ThrottleError, TicketId, Timeout};

pub(crate) type OperationFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The caller's operation, type-erased and bound to its ticket. Calling it
/// invokes the operation and returns the future that runs it to completion
/// and reports back to the engine.
pub(crate) type Launch = Box<dyn FnOnce() -> OperationFuture + Send>;

/// Type-erased sending half of a completion.
///
/// Timeouts don't depend on the operation's types, so they are delivered
/// through the trait. Values and operation errors are delivered by the
/// operation's own future, which knows `T` and `E` and downcasts.
pub(crate) trait Responder: Send {
    fn time_out(self: Box<Self>, kind: Timeout, ticket: TicketId, timeout: Duration);

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

pub(crate) struct Pending<T, E> {
    tx: oneshot::Sender<Result<T, ThrottleError<E>>>,
}

impl<T, E> Pending<T, E> {
    pub fn new(tx: oneshot::Sender<Result<T, ThrottleError<E>>>) -> Self {
        Self { tx }
    }

    /// Deliver the final result. A dropped `Completion` is not an error.
    pub fn send(self, result: Result<T, ThrottleError<E>>) {
        let _ = self.tx.send(result);
    }
}

impl<T: Send + 'static, E: Send + 'static> Responder for Pending<T, E> {
    fn time_out(self: Box<Self>, kind: Timeout, ticket: TicketId, timeout: Duration) {
        (*self).send(Err(kind.into_error(ticket, timeout)));
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Metadata + operation + completion for a task inside the engine.
///
/// Design:
/// - Lives in exactly one engine structure (waiting queue or running set)
///   until it turns terminal, then it is removed and consumed.
/// - Owns its single active timer; replacing `timer` disarms the old one.
pub(crate) struct TaskRecord {
    pub ticket: TicketId,
    pub state: TaskState,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,

    timer: Option<Timer>,

    /// Present until the operation starts.
    launch: Option<Launch>,

    /// The operation's task, once started.
    operation: Option<AbortHandle>,

    responder: Box<dyn Responder>,
}

impl TaskRecord {
    pub fn new(
        ticket: TicketId,
        enqueued_at: DateTime<Utc>,
        launch: Launch,
        responder: Box<dyn Responder>,
    ) -> Self {
        Self {
            ticket,
            state: TaskState::Waiting,
            enqueued_at,
            started_at: None,
            timer: None,
            launch: Some(launch),
            operation: None,
            responder,
        }
    }

    /// Install the deadline for the current phase, canceling the previous one.
    pub fn arm(&mut self, timer: Timer) {
        self.timer = Some(timer);
    }

    /// Waiting -> Running. Hands out the operation exactly once.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Launch> {
        self.state = TaskState::Running;
        self.started_at = Some(now);
        self.launch.take()
    }

    pub fn attach_operation(&mut self, handle: AbortHandle) {
        self.operation = Some(handle);
    }

    /// Consume the record after it left its structure: disarm the timer and
    /// stop the operation if it is still going. Returns the responder so the
    /// caller can deliver the single terminal signal.
    pub fn finish(mut self, state: TaskState) -> Box<dyn Responder> {
        debug_assert!(state.is_terminal());
        self.state = state;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        if state == TaskState::RunTimeout
            && let Some(operation) = self.operation.take()
        {
            operation.abort();
        }
        self.responder
    }
}

impl std::fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("ticket", &self.ticket)
            .field("state", &self.state)
            .field("enqueued_at", &self.enqueued_at)
            .field("started_at", &self.started_at)
            .field("armed", &self.timer.is_some())
            .finish()
    }
}
