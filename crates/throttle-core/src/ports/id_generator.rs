//! IdGenerator port - チケットの生成
//!
//! チケットは 1 つのスロットル内で一意であればよい。

use crate::domain::ids::TicketId;
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_ticket(&self) -> TicketId;
}

/// UlidGenerator は ULID ベースの生成器
///
/// # 実装
/// - timestamp: `Clock` のミリ秒
/// - random: 80-bit の乱数
///
/// # テスト容易性
/// - FixedClock を渡すとチケットの timestamp が固定される
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_ticket(&self) -> TicketId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TicketId::from(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[test]
    fn ulid_generator_generates_unique_tickets() {
        let id_gen = UlidGenerator::new(SystemClock);
        let tickets: HashSet<_> = (0..1000).map(|_| id_gen.generate_ticket()).collect();
        assert_eq!(tickets.len(), 1000);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_ticket();
        let id2 = id_gen.generate_ticket();

        // 乱数部分は異なる
        assert_ne!(id1, id2);
        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
