//! Bounded-latency coalescing of bursty trigger events.
//!
//! Watch notifications arrive in storms: a single applied manifest can
//! produce dozens of change events within milliseconds. The coalescer
//! collapses a burst into one downstream call, firing after a quiet
//! period of `min_delay` but never later than `max_delay` after the
//! first trigger of the burst.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Per-burst window state. The generation counter invalidates timers
/// superseded by a newer trigger.
#[derive(Debug, Default)]
struct Window {
    generation: u64,
    burst_deadline: Option<Instant>,
}

struct CoalesceInner<F> {
    callback: F,
    min_delay: Duration,
    max_delay: Duration,
    window: Mutex<Window>,
}

/// Collapses bursts of [`trigger`](Self::trigger) calls into single
/// invocations of the wrapped callback.
///
/// Every trigger restarts the quiet-period timer, but the callback still
/// fires no later than `max_delay` after the first trigger of the
/// current burst. After it fires, the window resets and the next trigger
/// opens a new burst.
pub struct Coalescer<F> {
    inner: Arc<CoalesceInner<F>>,
}

impl<F> Clone for Coalescer<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F> Coalescer<F>
where
    F: Fn() + Send + Sync + 'static,
{
    /// Wraps `callback` with the given quiet period and latency bound.
    pub fn new(callback: F, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            inner: Arc::new(CoalesceInner {
                callback,
                min_delay,
                max_delay,
                window: Mutex::new(Window::default()),
            }),
        }
    }

    /// Records a trigger event.
    ///
    /// Must be called from within a tokio runtime. The callback runs on
    /// a spawned task once the burst settles or the latency bound is
    /// reached.
    pub fn trigger(&self) {
        let now = Instant::now();
        let mut window = self.lock_window();
        let deadline = *window
            .burst_deadline
            .get_or_insert(now + self.inner.max_delay);
        let fire_at = deadline.min(now + self.inner.min_delay);
        window.generation += 1;
        let generation = window.generation;
        drop(window);

        trace!("trigger {generation}, firing at {fire_at:?}");
        // Each trigger arms its own timer; timers superseded by a later
        // trigger fail the generation check and exit, so at most one
        // callback fires per burst and stale timers live no longer than
        // min_delay.
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(fire_at).await;
            if this.close_window(generation) {
                (this.inner.callback)();
            }
        });
    }

    /// Resets the window if `generation` is still current, returning
    /// whether this timer won the burst.
    fn close_window(&self, generation: u64) -> bool {
        let mut window = self.lock_window();
        if window.generation != generation {
            return false;
        }
        window.burst_deadline = None;
        true
    }

    fn lock_window(&self) -> std::sync::MutexGuard<'_, Window> {
        self.inner
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counting(fired: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
        let fired = Arc::clone(fired);
        move || {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_merges_frequent_calls() {
        let fired = Arc::new(AtomicUsize::new(0));
        let coalescer = Coalescer::new(
            counting(&fired),
            Duration::from_millis(10),
            Duration::from_millis(1000),
        );

        for _ in 0..5 {
            coalescer.trigger();
        }
        sleep(Duration::from_millis(50)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_exceed_max_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let coalescer = Coalescer::new(
            counting(&fired),
            Duration::from_millis(150),
            Duration::from_millis(420),
        );

        // Trigger every 100ms: the quiet period never elapses inside a
        // burst, so only the latency bound fires the callback.
        for _ in 0..10 {
            sleep(Duration::from_millis(100)).await;
            coalescer.trigger();
        }
        sleep(Duration::from_millis(300)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_burst_after_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let coalescer = Coalescer::new(
            counting(&fired),
            Duration::from_millis(10),
            Duration::from_millis(1000),
        );

        coalescer.trigger();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        coalescer.trigger();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_restarts_on_each_trigger() {
        let fired = Arc::new(AtomicUsize::new(0));
        let coalescer = Coalescer::new(
            counting(&fired),
            Duration::from_millis(100),
            Duration::from_millis(10_000),
        );

        for _ in 0..3 {
            coalescer.trigger();
            sleep(Duration::from_millis(60)).await;
        }
        // 180ms in, still inside the restarted quiet period.
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
