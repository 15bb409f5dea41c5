#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use throttle_core::ports::Clock;

/// Wall clock that follows Tokio's (pausable) time, starting exactly on a
/// second boundary.
pub struct TokioClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn start() -> Arc<Self> {
        Arc::new(Self {
            base: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            origin: tokio::time::Instant::now(),
        })
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed()).unwrap();
        self.base + elapsed
    }
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub async fn sleep_ms(n: u64) {
    tokio::time::sleep(ms(n)).await;
}
