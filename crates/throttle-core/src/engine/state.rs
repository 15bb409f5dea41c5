//! Engine bookkeeping: running set, waiting queue, TPS counter.
//!
//! Nothing here spawns or awaits; `Shared` in `throttle.rs` wires these
//! transitions to timers and operations.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use super::rate::TpsCounter;
use super::record::TaskRecord;
use super::timer::Timer;
use crate::domain::{ResolvedOptions, TaskState, ThrottleStatus, TicketId};

/// Outcome of the admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    /// Every concurrency slot is taken. The next completion re-checks.
    Saturated,
    /// A slot is free but this second's TPS budget is spent.
    RateLimited,
}

#[derive(Debug, Default)]
pub(crate) struct ThrottleState {
    /// Invariant: every member is `Running`.
    pub running: HashMap<TicketId, TaskRecord>,

    /// Submission order. Invariant: no member is `Running`.
    pub waiting: VecDeque<TaskRecord>,

    pub tps: TpsCounter,

    /// Deferred re-check at the next second boundary (at most one).
    pub recheck: Option<Timer>,
}

impl ThrottleState {
    pub fn admission(&self, now: DateTime<Utc>, options: &ResolvedOptions) -> Admission {
        if self.running.len() >= options.concurrent {
            Admission::Saturated
        } else if !self.tps.has_room(now, options.tps) {
            Admission::RateLimited
        } else {
            Admission::Admit
        }
    }

    /// Admission for a fresh submission. Anything already queued goes first.
    pub fn admission_on_submit(&self, now: DateTime<Utc>, options: &ResolvedOptions) -> Admission {
        match self.admission(now, options) {
            Admission::Admit if !self.waiting.is_empty() => Admission::Saturated,
            other => other,
        }
    }

    /// Count the admission and put the record into the running set.
    pub fn admit(&mut self, record: TaskRecord, now: DateTime<Utc>) {
        debug_assert_eq!(record.state, TaskState::Running);
        self.tps.record(now);
        self.running.insert(record.ticket, record);
    }

    pub fn enqueue(&mut self, record: TaskRecord) {
        debug_assert_eq!(record.state, TaskState::Waiting);
        self.waiting.push_back(record);
    }

    pub fn take_running(&mut self, ticket: TicketId) -> Option<TaskRecord> {
        self.running.remove(&ticket)
    }

    pub fn take_waiting(&mut self, ticket: TicketId) -> Option<TaskRecord> {
        let index = self.waiting.iter().position(|r| r.ticket == ticket)?;
        self.waiting.remove(index)
    }

    pub fn status(&self, now: DateTime<Utc>) -> ThrottleStatus {
        ThrottleStatus {
            running: self.running.len(),
            waiting: self.waiting.len(),
            recent_throughput: self.tps.count_at(now),
        }
    }
}
