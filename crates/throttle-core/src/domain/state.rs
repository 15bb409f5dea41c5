//! State - タスクの状態

use serde::{Deserialize, Serialize};

/// TaskState はタスクの状態を表現
///
/// # 状態遷移
/// - Waiting -> Running -> Resolved | RunTimeout | Failed
/// - Waiting -> WaitTimeout
/// - Running -> Resolved | RunTimeout | Failed (admitted on submit)
///
/// A task is dropped from every engine structure the moment it becomes
/// terminal, so terminal states only ever show up in logs and outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Queued, waiting for a concurrency slot or the next TPS window.
    Waiting,

    /// Admitted; the operation is executing.
    Running,

    /// The operation finished with a value.
    Resolved,

    /// The deadline elapsed while running.
    RunTimeout,

    /// The deadline elapsed while still queued.
    WaitTimeout,

    /// The operation itself returned an error or panicked.
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Waiting | TaskState::Running)
    }

    /// Which terminal state an expired timer produces for a task in `self`.
    pub fn on_timeout(self) -> Option<TaskState> {
        match self {
            TaskState::Waiting => Some(TaskState::WaitTimeout),
            TaskState::Running => Some(TaskState::RunTimeout),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::waiting(TaskState::Waiting, false)]
    #[case::running(TaskState::Running, false)]
    #[case::resolved(TaskState::Resolved, true)]
    #[case::run_timeout(TaskState::RunTimeout, true)]
    #[case::wait_timeout(TaskState::WaitTimeout, true)]
    #[case::failed(TaskState::Failed, true)]
    fn terminal_states(#[case] state: TaskState, #[case] terminal: bool) {
        assert_eq!(state.is_terminal(), terminal);
    }

    #[test]
    fn timeout_depends_on_phase() {
        assert_eq!(TaskState::Waiting.on_timeout(), Some(TaskState::WaitTimeout));
        assert_eq!(TaskState::Running.on_timeout(), Some(TaskState::RunTimeout));
        assert_eq!(TaskState::Resolved.on_timeout(), None);
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let s = serde_json::to_string(&TaskState::WaitTimeout).unwrap();
        assert_eq!(s, "\"WAIT_TIMEOUT\"");
    }
}
