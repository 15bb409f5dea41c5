//! Ports - エンジンが依存する抽象
//!
//! テストでは時刻と ID を固定した実装に差し替えます。

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
