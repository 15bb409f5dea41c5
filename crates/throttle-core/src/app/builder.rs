//! ThrottleBuilder - スロットルの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - オプションの正規化はここで一度だけ行う
//! - Tokio ランタイムがなければ build() が BuildError を返す

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::domain::ThrottleOptions;
use crate::engine::Throttle;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};

/// BuildError はスロットル構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no Tokio runtime is running; build the throttle from inside one or pass a handle")]
    NoRuntime,
}

/// ThrottleBuilder は `Throttle` を構築
///
/// # 使用例
/// ```ignore
/// let throttle = Throttle::builder()
///     .timeout(Duration::from_millis(200))
///     .concurrent(10)
///     .tps(50)
///     .build()?;
/// ```
#[derive(Default)]
pub struct ThrottleBuilder {
    options: ThrottleOptions,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    runtime: Option<Handle>,
}

impl ThrottleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// オプションをまとめて設定（JSON から読み込んだものなど）
    pub fn options(mut self, options: ThrottleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn concurrent(mut self, concurrent: usize) -> Self {
        self.options.concurrent = Some(concurrent);
        self
    }

    pub fn tps(mut self, tps: u32) -> Self {
        self.options.tps = Some(tps);
        self
    }

    /// TPS の集計とチケットの timestamp に使う時計
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// spawn 先のランタイム（省略時は現在のランタイム）
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<Throttle, BuildError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        Ok(Throttle::from_parts(
            self.options.normalize(),
            clock,
            ids,
            runtime,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_CONCURRENT, DEFAULT_TIMEOUT};

    #[test]
    fn build_outside_runtime_fails() {
        let result = ThrottleBuilder::new().build();
        assert!(matches!(result, Err(BuildError::NoRuntime)));
    }

    #[test]
    fn build_with_explicit_runtime_handle() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let throttle = ThrottleBuilder::new()
            .runtime(rt.handle().clone())
            .concurrent(3)
            .build()
            .unwrap();
        assert_eq!(throttle.options().concurrent, 3);
    }

    #[tokio::test]
    async fn build_applies_defaults() {
        let throttle = ThrottleBuilder::new().build().unwrap();
        assert_eq!(throttle.options().timeout, DEFAULT_TIMEOUT);
        assert_eq!(throttle.options().concurrent, DEFAULT_CONCURRENT);
        assert_eq!(throttle.options().tps, None);
    }

    #[tokio::test]
    async fn setters_override_loaded_options() {
        let loaded = ThrottleOptions::new().with_concurrent(5).with_tps(20);
        let throttle = ThrottleBuilder::new()
            .options(loaded)
            .tps(0)
            .timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(throttle.options().concurrent, 5);
        // 0 は正規化で消える
        assert_eq!(throttle.options().tps, None);
        assert_eq!(throttle.options().timeout, Duration::from_millis(250));
    }
}
