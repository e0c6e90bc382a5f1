use std::time::Duration;

use tokio::{runtime::Handle, select, time::Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

/// A scheduled, fire-once flush.
///
/// The sleeping task is cancelled as soon as the timer is dropped, so
/// replacing or clearing the owner's `Option<FlushTimer>` is all it takes
/// to guarantee a stale timer never fires.
pub(crate) struct FlushTimer {
    id: u64,
    _guard: DropGuard,
}

impl std::fmt::Debug for FlushTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushTimer").field("id", &self.id).finish()
    }
}

impl FlushTimer {
    pub fn spawn<F>(runtime: &Handle, id: u64, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        runtime.spawn(async move {
            select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => on_fire(),
            }
        });
        Self {
            id,
            _guard: token.drop_guard(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    fn flag_timer(delay: Duration) -> (FlushTimer, Arc<AtomicBool>) {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let timer = FlushTimer::spawn(&Handle::current(), 1, delay, move || {
            flag.store(true, Ordering::Release)
        });
        (timer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (timer, fired) = flag_timer(Duration::from_millis(100));
        assert_eq!(timer.id(), 1);
        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(!fired.load(Ordering::Acquire));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::Acquire));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (timer, fired) = flag_timer(Duration::from_millis(100));
        drop(timer);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!fired.load(Ordering::Acquire));
    }
}
