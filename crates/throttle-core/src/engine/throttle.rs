//! The throttle engine.
//!
//! Three kinds of events drive it: a submission, an operation reporting its
//! result, and a timer firing. Each one takes the state lock, applies its
//! transition, re-evaluates the waiting queue and releases the lock without
//! ever awaiting in between.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};

use super::completion::Completion;
use super::rate::TpsCounter;
use super::record::{Launch, OperationFuture, Pending, TaskRecord};
use super::state::{Admission, ThrottleState};
use super::timer::Timer;
use super::unwind::{CatchPanic, panic_message};
use crate::app::builder::ThrottleBuilder;
use crate::app::BuildError;
use crate::domain::{
    ResolvedOptions, TaskState, ThrottleError, ThrottleOptions, ThrottleStatus, TicketId, Timeout,
};
use crate::ports::{Clock, IdGenerator};

/// Limits how many operations run at once and how many start per second.
///
/// Excess submissions wait in FIFO order. Each phase (waiting, then running)
/// gets its own full `timeout` window: a task that waited almost `timeout`
/// still gets a fresh `timeout` to run once admitted.
///
/// ```ignore
/// let throttle = Throttle::builder().concurrent(10).timeout(Duration::from_secs(1)).build()?;
/// let value = throttle.submit(|| async { Ok::<_, MyError>(42) }).await?;
/// ```
///
/// Cloning is cheap and every clone drives the same engine.
#[derive(Clone)]
pub struct Throttle {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    options: ResolvedOptions,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    runtime: Handle,
    state: Mutex<ThrottleState>,
}

impl Throttle {
    pub fn builder() -> ThrottleBuilder {
        ThrottleBuilder::new()
    }

    /// Shorthand for `Throttle::builder().options(options).build()`.
    pub fn new(options: ThrottleOptions) -> Result<Self, BuildError> {
        Self::builder().options(options).build()
    }

    pub(crate) fn from_parts(
        options: ResolvedOptions,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                options,
                clock,
                ids,
                runtime,
                state: Mutex::new(ThrottleState::default()),
            }),
        }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.shared.options
    }

    /// Submit an operation. It starts now if a slot and TPS budget are free
    /// (and nothing is queued ahead of it), otherwise it waits its turn.
    ///
    /// `op` is only called once the task is admitted; a task that times out
    /// while waiting never calls it.
    pub fn submit<F, Fut, T, E>(&self, op: F) -> Completion<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let ticket = self.shared.ids.generate_ticket();
        let (tx, rx) = oneshot::channel();

        let shared = Arc::clone(&self.shared);
        let launch: Launch = Box::new(move || -> OperationFuture {
            Box::pin(async move {
                let result = match CatchPanic::new(async move { op().await }).await {
                    Ok(result) => result.map_err(ThrottleError::Operation),
                    Err(payload) => Err(ThrottleError::Panicked {
                        ticket,
                        message: panic_message(&*payload),
                    }),
                };
                shared.settle::<T, E>(ticket, result);
            })
        });

        let record = TaskRecord::new(
            ticket,
            self.shared.clock.now(),
            launch,
            Box::new(Pending::<T, E>::new(tx)),
        );
        self.shared.enqueue(record);

        Completion::new(ticket, rx)
    }

    pub fn status(&self) -> ThrottleStatus {
        let now = self.shared.clock.now();
        self.shared.lock().status(now)
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("options", &self.shared.options)
            .field("status", &self.status())
            .finish()
    }
}

impl Shared {
    /// Bookkeeping never panics mid-transition, so a poisoned lock still
    /// holds consistent state.
    fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(self: &Arc<Self>, mut record: TaskRecord) {
        let mut state = self.lock();
        let now = self.clock.now();
        match state.admission_on_submit(now, &self.options) {
            Admission::Admit => {
                debug!(
                    ticket = %record.ticket,
                    running = state.running.len(),
                    "admitted on submit"
                );
                self.start(&mut state, record, now);
            }
            admission => {
                record.arm(self.arm_timeout(record.ticket, Timeout::Wait));
                debug!(
                    ticket = %record.ticket,
                    waiting = state.waiting.len() + 1,
                    ?admission,
                    "queued"
                );
                state.enqueue(record);
                if admission == Admission::RateLimited {
                    self.schedule_recheck(&mut state, now);
                }
            }
        }
    }

    /// Waiting -> Running: fresh deadline, count the admission, run the operation.
    fn start(
        self: &Arc<Self>,
        state: &mut ThrottleState,
        mut record: TaskRecord,
        now: DateTime<Utc>,
    ) {
        let ticket = record.ticket;
        let Some(launch) = record.start(now) else {
            error!(ticket = %ticket, "task admitted without an operation");
            return;
        };
        record.arm(self.arm_timeout(ticket, Timeout::Run));
        let operation = self.runtime.spawn(launch());
        record.attach_operation(operation.abort_handle());
        state.admit(record, now);
    }

    fn arm_timeout(self: &Arc<Self>, ticket: TicketId, kind: Timeout) -> Timer {
        let shared = Arc::clone(self);
        Timer::arm(&self.runtime, self.options.timeout, move || {
            shared.expire(ticket, kind)
        })
    }

    /// Operation finished, failed or panicked. Only the first terminal signal
    /// for a ticket gets through: whoever removes the record delivers.
    fn settle<T, E>(self: &Arc<Self>, ticket: TicketId, result: Result<T, ThrottleError<E>>)
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let mut state = self.lock();
        let Some(record) = state.take_running(ticket) else {
            trace!(ticket = %ticket, "result arrived after the task was already terminal");
            return;
        };

        let outcome = match &result {
            Ok(_) => TaskState::Resolved,
            Err(ThrottleError::Panicked { message, .. }) => {
                warn!(ticket = %ticket, %message, "operation panicked");
                TaskState::Failed
            }
            Err(_) => TaskState::Failed,
        };
        debug!(ticket = %ticket, ?outcome, "operation finished");

        match record.finish(outcome).into_any().downcast::<Pending<T, E>>() {
            Ok(pending) => (*pending).send(result),
            Err(_) => error!(ticket = %ticket, "completion type mismatch"),
        }

        self.run_next_task(&mut state);
    }

    /// A deadline elapsed. `kind` says which structure the task should be in;
    /// a stale wait timer for a task that was already promoted finds nothing.
    fn expire(self: &Arc<Self>, ticket: TicketId, kind: Timeout) {
        let mut state = self.lock();
        let record = match kind {
            Timeout::Wait => state.take_waiting(ticket),
            Timeout::Run => state.take_running(ticket),
        };

        if let Some(record) = record
            && let Some(terminal) = record.state.on_timeout()
        {
            warn!(
                ticket = %ticket,
                ?terminal,
                timeout_ms = self.options.timeout.as_millis() as u64,
                "task timed out"
            );
            record
                .finish(terminal)
                .time_out(kind, ticket, self.options.timeout);
        }

        self.run_next_task(&mut state);
    }

    /// Promote waiting tasks, oldest first, while admission allows.
    fn run_next_task(self: &Arc<Self>, state: &mut ThrottleState) {
        while !state.waiting.is_empty() {
            let now = self.clock.now();
            match state.admission(now, &self.options) {
                Admission::Admit => {
                    let Some(record) = state.waiting.pop_front() else {
                        break;
                    };
                    debug!(
                        ticket = %record.ticket,
                        waited_ms = (now - record.enqueued_at).num_milliseconds(),
                        "promoted from queue"
                    );
                    self.start(state, record, now);
                }
                Admission::RateLimited => {
                    self.schedule_recheck(state, now);
                    break;
                }
                // the next completion or timeout frees a slot and re-checks
                Admission::Saturated => break,
            }
        }
    }

    /// One deferred re-evaluation at the next second boundary.
    fn schedule_recheck(self: &Arc<Self>, state: &mut ThrottleState, now: DateTime<Utc>) {
        if state.recheck.is_some() {
            return;
        }
        let delay = TpsCounter::until_next_second(now);
        trace!(delay_ms = delay.as_millis() as u64, "tps budget spent, re-checking next second");

        let shared = Arc::clone(self);
        state.recheck = Some(Timer::arm(&self.runtime, delay, move || {
            let mut state = shared.lock();
            state.recheck = None;
            shared.run_next_task(&mut state);
        }));
    }
}
