use serde::{Deserialize, Serialize};

/// ThrottleStatus はある時点のスロットルの様子
///
/// エンジンのロック下で取得しますが、返した直後から古くなります。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleStatus {
    pub running: usize,
    pub waiting: usize,
    /// 現在の暦秒で受け入れたタスク数
    pub recent_throughput: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_flat() {
        let status = ThrottleStatus {
            running: 2,
            waiting: 5,
            recent_throughput: 7,
        };
        let v = serde_json::to_value(status).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"running": 2, "waiting": 5, "recent_throughput": 7})
        );
    }
}
