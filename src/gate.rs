//! Single-flight invocation gate with failure retry.
//!
//! Sync cycles must never overlap: a burst of change notifications while
//! a cycle is running should collapse into exactly one follow-up cycle,
//! and a failed cycle should be retried after a delay. The gate is a
//! small state machine (`Idle`, `Running { pending }`) driven by
//! completion events and timer expirations.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

/// Per-gate state. At most one underlying invocation is in flight, with
/// at most one queued rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// No invocation in flight.
    Idle,
    /// An invocation is in flight; `pending` queues exactly one rerun.
    Running {
        /// Whether a rerun was requested while running.
        pending: bool,
    },
}

struct GateInner<F> {
    op: F,
    retry_delay: Option<Duration>,
    state: Mutex<GateState>,
}

/// Guarded invoker serializing calls to one asynchronous operation.
///
/// [`request`](Self::request) is fire-and-forget: results are not
/// resurfaced to the caller, and failures are observable only through
/// the operation's own side effects (plus a log line here). Requests
/// made while an invocation is in flight coalesce into a single queued
/// rerun that starts as soon as the current invocation completes,
/// whether it succeeded or failed.
///
/// Independently, when a `retry_delay` is configured, a failed
/// invocation schedules a delayed re-request routed back through the
/// gate; if the gate is busy by the time the timer fires, the retry
/// simply becomes the queued rerun. Both paths may fire from the same
/// completion.
pub struct SerialGate<F> {
    inner: Arc<GateInner<F>>,
}

impl<F> Clone for SerialGate<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F, Fut> SerialGate<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    /// Creates a gate around `op`, optionally retrying failed
    /// invocations after `retry_delay`.
    pub fn new(op: F, retry_delay: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(GateInner {
                op,
                retry_delay,
                state: Mutex::new(GateState::Idle),
            }),
        }
    }

    /// Requests an invocation of the guarded operation.
    ///
    /// Starts the operation immediately when the gate is idle; otherwise
    /// marks a single rerun as pending. Must be called from within a
    /// tokio runtime.
    pub fn request(&self) {
        let mut state = self.lock_state();
        match *state {
            GateState::Running { .. } => {
                debug!("invocation in flight, queueing rerun");
                *state = GateState::Running { pending: true };
            }
            GateState::Idle => {
                *state = GateState::Running { pending: false };
                drop(state);
                let gate = self.clone();
                tokio::spawn(async move { gate.run().await });
            }
        }
    }

    /// Runs the operation until no rerun is pending.
    async fn run(self) {
        loop {
            let outcome = (self.inner.op)().await;
            if let Err(err) = outcome {
                warn!("guarded operation failed: {err}");
                if let Some(delay) = self.inner.retry_delay {
                    debug!("scheduling retry in {delay:?}");
                    let gate = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        gate.request();
                    });
                }
            }

            let mut state = self.lock_state();
            if *state == (GateState::Running { pending: true }) {
                *state = GateState::Running { pending: false };
                // Loop around for the queued rerun.
            } else {
                *state = GateState::Idle;
                return;
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GateState> {
        // The critical sections never panic, but a poisoned lock would
        // otherwise wedge the gate permanently.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::sleep;

    type OpFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

    /// Records invocations and fails the first `initial_failures` calls,
    /// asserting that runs never overlap.
    struct OpTracker {
        in_use: AtomicBool,
        calls: AtomicUsize,
        successes: AtomicUsize,
        failures: AtomicUsize,
        initial_failures: usize,
    }

    impl OpTracker {
        fn new(initial_failures: usize) -> Arc<Self> {
            Arc::new(Self {
                in_use: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                successes: AtomicUsize::new(0),
                failures: AtomicUsize::new(0),
                initial_failures,
            })
        }

        fn gate(
            self: &Arc<Self>,
            retry_delay: Option<Duration>,
        ) -> SerialGate<impl Fn() -> OpFuture + Send + Sync + 'static> {
            let tracker = Arc::clone(self);
            SerialGate::new(
                move || -> OpFuture {
                    let tracker = Arc::clone(&tracker);
                    Box::pin(async move {
                        assert!(
                            !tracker.in_use.swap(true, Ordering::SeqCst),
                            "operation already in flight"
                        );
                        tracker.calls.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(10)).await;
                        tracker.in_use.store(false, Ordering::SeqCst);
                        if tracker.failures.load(Ordering::SeqCst) < tracker.initial_failures {
                            tracker.failures.fetch_add(1, Ordering::SeqCst);
                            Err(SyncError::internal("scheduled failure"))
                        } else {
                            tracker.successes.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    })
                },
                retry_delay,
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_requests_coalesce() {
        let tracker = OpTracker::new(0);
        let gate = tracker.gate(None);
        for _ in 0..10 {
            gate.request();
        }
        sleep(Duration::from_millis(500)).await;

        let calls = tracker.calls.load(Ordering::SeqCst);
        assert!(calls > 1, "no rerun happened: {calls} calls");
        assert!(calls < 10, "requests did not coalesce: {calls} calls");
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_at_different_times() {
        let tracker = OpTracker::new(0);
        let gate = tracker.gate(None);
        for delay in [5u64, 15, 16, 20, 28] {
            let gate = gate.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(delay)).await;
                gate.request();
            });
        }
        sleep(Duration::from_millis(100)).await;

        let calls = tracker.calls.load(Ordering::SeqCst);
        assert!(calls > 1);
        assert_eq!(
            tracker.successes.load(Ordering::SeqCst) + tracker.failures.load(Ordering::SeqCst),
            calls
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reruns_after_retry_delay() {
        let tracker = OpTracker::new(1);
        let gate = tracker.gate(Some(Duration::from_millis(10)));
        gate.request();
        sleep(Duration::from_millis(100)).await;

        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_rerun_and_retry_timer_are_independent() {
        let tracker = OpTracker::new(1);
        let gate = tracker.gate(Some(Duration::from_millis(50)));
        gate.request();
        sleep(Duration::from_millis(5)).await;
        gate.request();
        sleep(Duration::from_millis(95)).await;

        // The queued rerun runs immediately after the failure; the retry
        // timer independently produces a third invocation.
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_without_configured_delay() {
        let tracker = OpTracker::new(1);
        let gate = tracker.gate(None);
        gate.request();
        sleep(Duration::from_millis(100)).await;

        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 0);
    }
}
