//! Options - スロットルの設定
//!
//! すべてのオプションは省略可能です。
//! 省略された値や 0 はエラーにせず、下のデフォルト値に置き換えます。

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 各フェーズ（待機、実行）に適用されるデフォルトのタイムアウト
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// デフォルトの同時実行数
pub const DEFAULT_CONCURRENT: usize = 10_000;

/// ThrottleOptions は利用者が渡す設定
///
/// `Throttle::new` に渡すか、JSON から読み込みます。
///
/// # 使用例
/// ```ignore
/// let opts: ThrottleOptions = serde_json::from_str(r#"{"timeout_ms": 200, "concurrent": 10}"#)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleOptions {
    #[serde(
        default,
        rename = "timeout_ms",
        with = "millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tps: Option<u32>,
}

impl ThrottleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_concurrent(mut self, concurrent: usize) -> Self {
        self.concurrent = Some(concurrent);
        self
    }

    pub fn with_tps(mut self, tps: u32) -> Self {
        self.tps = Some(tps);
        self
    }

    /// デフォルト値を適用する
    ///
    /// # 実装
    /// - timeout / concurrent: None または 0 ならデフォルト値
    /// - tps: None または 0 なら無制限（None）
    pub fn normalize(&self) -> ResolvedOptions {
        ResolvedOptions {
            timeout: self
                .timeout
                .filter(|t| !t.is_zero())
                .unwrap_or(DEFAULT_TIMEOUT),
            concurrent: self
                .concurrent
                .filter(|&c| c > 0)
                .unwrap_or(DEFAULT_CONCURRENT),
            tps: self.tps.filter(|&t| t > 0),
        }
    }
}

/// ResolvedOptions はデフォルト適用後の設定（`tps: None` は無制限）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    #[serde(rename = "timeout_ms", serialize_with = "millis::serialize_duration")]
    pub timeout: Duration,
    pub concurrent: usize,
    pub tps: Option<u32>,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        ThrottleOptions::default().normalize()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serialize_duration(d, s),
            None => s.serialize_none(),
        }
    }

    pub fn serialize_duration<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
