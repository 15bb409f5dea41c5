//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID
//! ID は ULID を `Id<T>` で包んだものです。
//! `T` はコンパイル時にだけ存在するマーカー型（PhantomData）で、
//! 実行時にはメモリを消費しません。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: 生成順に並ぶのでログで追いやすい
//! - **128-bit**: UUID と同じサイズ

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（例: "ticket-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Ticket マーカー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ticket {}

impl IdMarker for Ticket {
    fn prefix() -> &'static str {
        "ticket-"
    }
}

/// TicketId は 1 回の submit を識別する
///
/// 実行中セット、待機キュー、タイマー、Completion の間で同じタスクを対応付けます。
pub type TicketId = Id<Ticket>;
