//! Domain - スロットルのドメインモデル
//!
//! ID、タスクの状態、エラー分類、オプション、ステータスを定義します。

pub mod errors;
pub mod ids;
pub mod options;
pub mod state;
pub mod status;

pub use self::errors::{ThrottleError, Timeout};
pub use self::ids::{Id, IdMarker, Ticket, TicketId};
pub use self::options::{DEFAULT_CONCURRENT, DEFAULT_TIMEOUT, ResolvedOptions, ThrottleOptions};
pub use self::state::TaskState;
pub use self::status::ThrottleStatus;
