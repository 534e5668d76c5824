//! Per-venue call scheduling: a reservoir rate limiter plus the backoff
//! policy applied when an upstream signals throttling.
//!
//! Each venue adapter gets its own limiter so one exhausted venue cannot
//! starve the others. Calls queue on the limiter instead of being rejected.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Limiter configuration: one in-flight call, minimum spacing between calls,
/// and a reservoir that refills in full every refresh interval.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub min_interval: Duration,
    pub reservoir: u32,
    pub refresh_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            reservoir: 60,
            refresh_interval: Duration::from_secs(60),
        }
    }
}

struct LimiterState {
    remaining: u32,
    window_start: Instant,
    last_call: Option<Instant>,
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        let state = LimiterState {
            remaining: config.reservoir,
            window_start: Instant::now(),
            last_call: None,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Run `f` once the limiter admits it. The state lock is held for the
    /// whole call, which is what serializes in-flight calls to one; waiting
    /// callers queue on the lock in arrival order.
    pub async fn schedule<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut state = self.state.lock().await;

        loop {
            let now = Instant::now();
            if now.duration_since(state.window_start) >= self.config.refresh_interval {
                state.remaining = self.config.reservoir;
                state.window_start = now;
            }

            if state.remaining == 0 {
                let wait = self
                    .config
                    .refresh_interval
                    .saturating_sub(now.duration_since(state.window_start));
                debug!("Reservoir exhausted, waiting {}ms for refill", wait.as_millis());
                tokio::time::sleep(wait).await;
                continue;
            }

            if let Some(last) = state.last_call {
                let since = now.duration_since(last);
                if since < self.config.min_interval {
                    tokio::time::sleep(self.config.min_interval - since).await;
                }
            }

            state.remaining -= 1;
            break;
        }

        let result = f().await;
        state.last_call = Some(Instant::now());
        result
    }
}

/// Exponential backoff applied on throttled upstream responses:
/// `delay = min(base * 2^attempt, max)`, up to `max_retries` retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map(|delay| delay.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_min_interval_spacing() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            min_interval: Duration::from_millis(30),
            reservoir: 10,
            refresh_interval: Duration::from_secs(60),
        });

        let start = Instant::now();
        for _ in 0..3 {
            limiter.schedule(|| async {}).await;
        }

        // Three calls: two enforced gaps of 30ms
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_reservoir_queues_instead_of_rejecting() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            min_interval: Duration::from_millis(1),
            reservoir: 2,
            refresh_interval: Duration::from_millis(80),
        });

        let counter = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        for _ in 0..3 {
            let counter = counter.clone();
            limiter
                .schedule(|| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        // The third call had to wait for the reservoir refill
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn test_one_call_in_flight() {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
            min_interval: Duration::from_millis(1),
            reservoir: 10,
            refresh_interval: Duration::from_secs(60),
        }));

        let in_flight = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .schedule(|| async move {
                        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        assert_eq!(current, 1, "more than one call in flight");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn test_backoff_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        // Capped at the maximum
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for(31), Duration::from_secs(10));
    }
}
