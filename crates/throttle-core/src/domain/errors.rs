//! Errors - エラー型と分類
//!
//! Completion を通じて submit した側に届くエラーを定義します。

use std::time::Duration;

use thiserror::Error;

use super::ids::TicketId;

/// ThrottleError はタスクが値を返せなかった理由
///
/// # 分類
/// - RunTimeout / WaitTimeout: どのフェーズでタイムアウトしたか
/// - Operation: 操作自身のエラー（そのまま渡す）
/// - Panicked: 操作が panic した
/// - Closed: 結果が届かなかった
///
/// 失敗したタスク 1 つにつき 1 回だけ届きます。リトライはしません。
#[derive(Debug, Error)]
pub enum ThrottleError<E> {
    /// The deadline elapsed after admission, before the operation finished.
    #[error("{ticket} timed out after {timeout:?} while running")]
    RunTimeout { ticket: TicketId, timeout: Duration },

    /// The deadline elapsed before the task was admitted. The operation was
    /// never invoked.
    #[error("{ticket} timed out after {timeout:?} while waiting for admission")]
    WaitTimeout { ticket: TicketId, timeout: Duration },

    /// The operation's own error, passed through unchanged.
    #[error("operation failed: {0}")]
    Operation(E),

    /// The operation panicked. Its slot is released right away.
    #[error("{ticket} panicked: {message}")]
    Panicked { ticket: TicketId, message: String },

    /// The result channel went away without a result (the runtime shut down
    /// under a pending task).
    #[error("throttle dropped the task without a result")]
    Closed,
}

impl<E> ThrottleError<E> {
    pub fn code(&self) -> &'static str {
        match self {
            ThrottleError::RunTimeout { .. } => "RUN_TIMEOUT",
            ThrottleError::WaitTimeout { .. } => "WAIT_TIMEOUT",
            ThrottleError::Operation(_) => "OPERATION_FAILED",
            ThrottleError::Panicked { .. } => "OPERATION_PANICKED",
            ThrottleError::Closed => "CLOSED",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ThrottleError::RunTimeout { .. } | ThrottleError::WaitTimeout { .. }
        )
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            ThrottleError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Which deadline fired. Carried by timers, turned into a `ThrottleError`
/// once the task has been removed from its owning structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Run,
    Wait,
}

impl Timeout {
    pub fn into_error<E>(self, ticket: TicketId, timeout: Duration) -> ThrottleError<E> {
        match self {
            Timeout::Run => ThrottleError::RunTimeout { ticket, timeout },
            Timeout::Wait => ThrottleError::WaitTimeout { ticket, timeout },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn ticket() -> TicketId {
        TicketId::from_ulid(Ulid::new())
    }

    #[rstest]
    #[case::run(Timeout::Run, "RUN_TIMEOUT")]
    #[case::wait(Timeout::Wait, "WAIT_TIMEOUT")]
    fn timeout_errors_carry_codes(#[case] timeout: Timeout, #[case] code: &str) {
        let err: ThrottleError<String> = timeout.into_error(ticket(), Duration::from_millis(100));
        assert_eq!(err.code(), code);
        assert!(err.is_timeout());
        assert!(err.into_operation().is_none());
    }

    #[test]
    fn operation_error_passes_through() {
        let err = ThrottleError::Operation("boom".to_string());
        assert_eq!(err.code(), "OPERATION_FAILED");
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "operation failed: boom");
        assert_eq!(err.into_operation().as_deref(), Some("boom"));
    }

    #[test]
    fn panic_is_not_a_timeout() {
        let t = ticket();
        let err: ThrottleError<String> = ThrottleError::Panicked {
            ticket: t,
            message: "boom".into(),
        };
        assert_eq!(err.code(), "OPERATION_PANICKED");
        assert!(!err.is_timeout());
        assert!(err.to_string().ends_with("panicked: boom"));
        assert!(err.into_operation().is_none());
    }

    #[test]
    fn wait_timeout_message_names_ticket() {
        let t = ticket();
        let err: ThrottleError<String> = Timeout::Wait.into_error(t, Duration::from_millis(200));
        let msg = err.to_string();
        assert!(msg.contains(&t.to_string()));
        assert!(msg.contains("waiting"));
    }
}
