//! Per-second admission counter.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Counts admissions per calendar second of the wall clock.
///
/// This is a fixed window, not a sliding one: up to `tps` admissions may land
/// at the end of one second and another `tps` at the start of the next, so any
/// two-second span sees at most `2 * tps`.
#[derive(Debug, Clone)]
pub struct TpsCounter {
    /// Unix second of the current bucket.
    second: i64,
    count: u32,
}

impl TpsCounter {
    pub fn new() -> Self {
        Self {
            second: i64::MIN,
            count: 0,
        }
    }

    /// Admissions recorded in the second containing `now`.
    pub fn count_at(&self, now: DateTime<Utc>) -> u32 {
        if now.timestamp() == self.second {
            self.count
        } else {
            0
        }
    }

    /// Whether one more admission fits in the second containing `now`.
    pub fn has_room(&self, now: DateTime<Utc>, limit: Option<u32>) -> bool {
        limit.is_none_or(|limit| self.count_at(now) < limit)
    }

    /// Count one admission. A new second restarts the bucket at 1.
    pub fn record(&mut self, now: DateTime<Utc>) {
        let second = now.timestamp();
        if second == self.second {
            self.count = self.count.saturating_add(1);
        } else {
            self.second = second;
            self.count = 1;
        }
    }

    /// Time left until the next whole second. Never zero, so a deferred
    /// re-check always lands in a later bucket than `now`.
    pub fn until_next_second(now: DateTime<Utc>) -> Duration {
        let into_second = u64::from(now.timestamp_subsec_millis()).min(999);
        Duration::from_millis(1000 - into_second)
    }
}

impl Default for TpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use rstest::rstest;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::milliseconds(ms)
    }

    #[test]
    fn fresh_counter_is_empty() {
        let counter = TpsCounter::new();
        assert_eq!(counter.count_at(at(0)), 0);
        assert!(counter.has_room(at(0), Some(1)));
    }

    #[test]
    fn counts_within_one_second() {
        let mut counter = TpsCounter::new();
        counter.record(at(10));
        counter.record(at(500));
        counter.record(at(999));
        assert_eq!(counter.count_at(at(999)), 3);
        assert!(!counter.has_room(at(999), Some(3)));
        assert!(counter.has_room(at(999), Some(4)));
    }

    #[test]
    fn new_second_restarts_bucket() {
        let mut counter = TpsCounter::new();
        counter.record(at(900));
        counter.record(at(950));
        assert_eq!(counter.count_at(at(1000)), 0);

        counter.record(at(1000));
        assert_eq!(counter.count_at(at(1001)), 1);
    }

    #[test]
    fn unbounded_always_has_room() {
        let mut counter = TpsCounter::new();
        for _ in 0..10_000 {
            counter.record(at(0));
        }
        assert!(counter.has_room(at(0), None));
    }

    #[rstest]
    #[case::start(0, 1000)]
    #[case::middle(250, 750)]
    #[case::end(999, 1)]
    fn delay_to_next_second(#[case] offset_ms: i64, #[case] expected_ms: u64) {
        assert_eq!(
            TpsCounter::until_next_second(at(offset_ms)),
            Duration::from_millis(expected_ms)
        );
    }
}
