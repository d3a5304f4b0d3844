//! Deferred work and step timeouts on the tokio runtime.
//!
//! Both helpers degrade gracefully outside a runtime: deferred work runs
//! inline and timeouts are not armed.

use std::time::Duration;

use tokio::runtime::Handle;

use crate::promise::Promise;

/// Run `task` on a later scheduler turn, or inline when no runtime is active.
pub(crate) fn defer<F>(task: F)
where
    F: FnOnce() + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::task::yield_now().await;
                task();
            });
        }
        Err(_) => task(),
    }
}

/// Reject with `on_timeout()` if `promise` has not settled within `limit`.
///
/// Returns a promise mirroring `promise`; whichever settles it first wins.
pub(crate) fn with_timeout<T, E, F>(
    promise: Promise<T, E>,
    limit: Option<Duration>,
    on_timeout: F,
) -> Promise<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce() -> E + Send + 'static,
{
    let Some(limit) = limit else {
        return promise;
    };
    if !promise.is_pending() {
        return promise;
    }
    let Ok(handle) = Handle::try_current() else {
        tracing::trace!("No tokio runtime, step timeout not armed");
        return promise;
    };

    let guarded = Promise::new();
    promise.forward_to(&guarded);
    let timer_target = guarded.clone();
    handle.spawn(async move {
        tokio::time::sleep(limit).await;
        if timer_target.is_pending() {
            timer_target.reject(on_timeout());
        }
    });
    guarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn defer_runs_inline_without_runtime() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        defer(move || flag.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn defer_waits_for_a_later_turn() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        defer(move || flag.store(true, Ordering::SeqCst));
        assert!(!ran.load(Ordering::SeqCst));
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_promise_times_out() {
        let stalled: Promise<(), String> = Promise::new();
        let guarded = with_timeout(stalled.clone(), Some(Duration::from_millis(50)), || {
            "timed out".to_string()
        });
        assert_eq!(guarded.wait().await, Err("timed out".to_string()));
        assert!(stalled.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn settling_first_beats_the_timer() {
        let quick: Promise<u8, String> = Promise::new();
        let guarded = with_timeout(quick.clone(), Some(Duration::from_secs(1)), || "late".to_string());
        quick.resolve(3);
        assert_eq!(guarded.wait().await, Ok(3));
    }

    #[test]
    fn no_limit_returns_the_same_promise() {
        let promise: Promise<(), String> = Promise::new();
        let guarded = with_timeout(promise.clone(), None, || "unused".to_string());
        promise.resolve(());
        assert!(guarded.is_resolved());
    }
}
