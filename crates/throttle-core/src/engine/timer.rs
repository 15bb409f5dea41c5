//! Owned one-shot timers.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// A spawned sleep that runs a callback once it elapses.
///
/// Dropping the timer cancels it, so whoever owns a `Timer` owns the
/// deadline: replacing or dropping the owner disarms it.
#[derive(Debug)]
pub struct Timer {
    handle: AbortHandle,
}

impl Timer {
    pub fn arm<F>(runtime: &Handle, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self {
            handle: task.abort_handle(),
        }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        // no-op if the callback already ran (or is running: it never awaits)
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let _timer = Timer::arm(&Handle::current(), Duration::from_millis(100), move || {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = Timer::arm(&Handle::current(), Duration::from_millis(100), move || {
            flag.store(true, Ordering::SeqCst);
        });
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
