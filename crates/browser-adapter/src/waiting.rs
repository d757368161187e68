//! Bounded polling shared by every backend.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::trace;

/// Poll `probe` until it returns `true` or `timeout` expires.
///
/// The probe always runs at least once, so a zero timeout still checks the current
/// state. Returns the elapsed time on success and `None` on expiry.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if probe().await {
            return Some(start.elapsed());
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            trace!(elapsed_ms = elapsed.as_millis() as u64, "poll budget exhausted");
            return None;
        }
        sleep(interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_once_probe_succeeds() {
        let calls = AtomicUsize::new(0);
        let waited = poll_until(Duration::from_secs(1), Duration::from_millis(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { n >= 2 }
        })
        .await;
        assert!(waited.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_timeout_probes_once() {
        let calls = AtomicUsize::new(0);
        let waited = poll_until(Duration::ZERO, Duration::from_millis(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { false }
        })
        .await;
        assert!(waited.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expires_within_budget() {
        let start = Instant::now();
        let waited = poll_until(Duration::from_millis(30), Duration::from_millis(10), || async {
            false
        })
        .await;
        assert!(waited.is_none());
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
