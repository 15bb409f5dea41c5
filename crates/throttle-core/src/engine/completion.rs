use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::domain::{ThrottleError, TicketId};

/// Handle to a submitted task. Resolves exactly once with the operation's
/// value or a `ThrottleError`.
///
/// Dropping it does not cancel the task; the result is discarded.
#[must_use = "a completion does nothing unless awaited"]
#[derive(Debug)]
pub struct Completion<T, E> {
    ticket: TicketId,
    rx: oneshot::Receiver<Result<T, ThrottleError<E>>>,
}

impl<T, E> Completion<T, E> {
    pub(crate) fn new(
        ticket: TicketId,
        rx: oneshot::Receiver<Result<T, ThrottleError<E>>>,
    ) -> Self {
        Self { ticket, rx }
    }

    pub fn ticket(&self) -> TicketId {
        self.ticket
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = Result<T, ThrottleError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ThrottleError::Closed)))
    }
}
