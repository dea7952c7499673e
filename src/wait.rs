//! Polling wait primitives.
//!
//! The target UI exposes no events, so asynchronous completions (login
//! finished, upload finished, toast appeared) are observed by polling an
//! externally visible predicate until it holds or a bound elapses.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Bounded retry budget: consumed monotonically, never replenished within
/// one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }
}

/// Poll `predicate` every `poll_interval` until it returns true or `timeout`
/// elapses. The predicate is checked once immediately, so a condition that
/// already holds costs no sleep. Returns whether the predicate was observed
/// true within the bound.
pub async fn wait_until<F>(mut predicate: F, poll_interval: Duration, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if predicate() {
            return true;
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return false;
        }
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
    }
}

/// [`wait_until`] for predicates that must await (page queries, cookie
/// reads). A predicate error counts as "not yet".
pub async fn wait_until_async<F, Fut>(
    mut predicate: F,
    poll_interval: Duration,
    timeout: Duration,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if predicate().await {
            return true;
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return false;
        }
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn true_immediately_without_sleeping() {
        let start = Instant::now();
        let ok = wait_until(|| true, Duration::from_secs(1), Duration::from_secs(10)).await;
        assert!(ok);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn false_exactly_at_timeout() {
        let start = Instant::now();
        let ok = wait_until(|| false, Duration::from_millis(300), Duration::from_secs(2)).await;
        assert!(!ok);
        // Never runs past the bound, even when the poll interval does not
        // divide it evenly.
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn observed_within_one_poll_of_becoming_true() {
        let start = Instant::now();
        let flip_at = Duration::from_millis(1050);
        let ok = wait_until(
            || start.elapsed() >= flip_at,
            Duration::from_millis(500),
            Duration::from_secs(10),
        )
        .await;
        assert!(ok);
        // Polls land at 0, 500ms, 1000ms, 1500ms; the flip at 1050ms is seen
        // on the very next poll.
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn async_variant_counts_attempts() {
        let mut calls = 0u32;
        let ok = wait_until_async(
            || {
                calls += 1;
                let done = calls >= 3;
                async move { done }
            },
            Duration::from_secs(1),
            Duration::from_secs(10),
        )
        .await;
        assert!(ok);
        assert_eq!(calls, 3);
    }
}
