use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use super::{AdmissionError, RateLimitConfig};
use crate::metrics;

/// Snapshot of the limiter for the API.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub capacity: u32,
    pub window_ms: u64,
    pub remaining: u32,
    /// Milliseconds until a slot frees up, when the window is full.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_slot_in_ms: Option<u64>,
}

/// Sliding-window admission gate.
///
/// Keeps the instants of recent admissions and never lets more than
/// `capacity` of them fall inside any trailing `window`. Entries are pruned
/// lazily on every check.
pub struct SlidingWindowLimiter {
    capacity: usize,
    window: Duration,
    safety_margin: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = config.capacity.max(1) as usize;
        Self {
            capacity,
            window: config.window(),
            safety_margin: config.safety_margin(),
            admissions: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Wait until a slot is free, then reserve it.
    pub async fn admit(&self, caller: &str) {
        loop {
            match self.try_reserve().await {
                Ok(()) => {
                    debug!(caller = %caller, "Admission granted");
                    return;
                }
                Err(wait) => {
                    debug!(
                        caller = %caller,
                        wait_ms = wait.as_millis() as u64,
                        "Window full, waiting for a slot"
                    );
                    metrics::ADMISSION_WAITS.with_label_values(&[caller]).inc();
                    sleep(wait).await;
                }
            }
        }
    }

    /// Like [`admit`](Self::admit), but gives up instead of waiting past `budget`.
    ///
    /// A denial reserves nothing.
    pub async fn admit_within(&self, caller: &str, budget: Duration) -> Result<(), AdmissionError> {
        let started = Instant::now();
        loop {
            match self.try_reserve().await {
                Ok(()) => {
                    debug!(caller = %caller, "Admission granted");
                    return Ok(());
                }
                Err(wait) => {
                    if started.elapsed() + wait > budget {
                        debug!(
                            caller = %caller,
                            retry_after_ms = wait.as_millis() as u64,
                            "Admission denied, wait exceeds budget"
                        );
                        metrics::ADMISSION_DENIALS.with_label_values(&[caller]).inc();
                        return Err(AdmissionError::Denied {
                            caller: caller.to_string(),
                            retry_after: wait,
                        });
                    }
                    metrics::ADMISSION_WAITS.with_label_values(&[caller]).inc();
                    sleep(wait).await;
                }
            }
        }
    }

    /// Number of admissions still available in the current window.
    pub async fn remaining(&self) -> u32 {
        let admissions = self.admissions.lock().await;
        let now = Instant::now();
        let live = admissions
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count();
        self.capacity.saturating_sub(live) as u32
    }

    pub async fn status(&self) -> RateLimitStatus {
        let admissions = self.admissions.lock().await;
        let now = Instant::now();
        let live: Vec<Instant> = admissions
            .iter()
            .copied()
            .filter(|t| now.duration_since(*t) < self.window)
            .collect();
        let remaining = self.capacity.saturating_sub(live.len());
        let next_slot_in_ms = if remaining == 0 {
            live.first().map(|oldest| {
                self.window
                    .saturating_sub(now.duration_since(*oldest))
                    .as_millis() as u64
            })
        } else {
            None
        };

        RateLimitStatus {
            capacity: self.capacity as u32,
            window_ms: self.window.as_millis() as u64,
            remaining: remaining as u32,
            next_slot_in_ms,
        }
    }

    /// Prune and reserve a slot, or return how long to wait before rechecking.
    async fn try_reserve(&self) -> Result<(), Duration> {
        let mut admissions = self.admissions.lock().await;
        let now = Instant::now();

        while let Some(oldest) = admissions.front() {
            if now.duration_since(*oldest) >= self.window {
                admissions.pop_front();
            } else {
                break;
            }
        }

        if admissions.len() < self.capacity {
            admissions.push_back(now);
            return Ok(());
        }

        let oldest = admissions.front().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)) + self.safety_margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    fn limiter(capacity: u32, window_ms: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(&RateLimitConfig {
            capacity,
            window_ms,
            safety_margin_ms: 100,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_capacity_immediately() {
        let limiter = limiter(5, 60_000);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.admit("test").await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.remaining().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_admission_waits_for_window() {
        let limiter = limiter(5, 60_000);
        for _ in 0..5 {
            limiter.admit("test").await;
        }

        tokio::time::advance(Duration::from_secs(10)).await;

        let mut sixth = task::spawn(limiter.admit("test"));
        assert_pending!(sixth.poll());

        // 50s after the first batch the window is still full.
        tokio::time::advance(Duration::from_secs(40)).await;
        assert_pending!(sixth.poll());

        tokio::time::advance(Duration::from_millis(10_200)).await;
        assert!(sixth.is_woken());
        assert_ready!(sixth.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_admission_total_wait() {
        let limiter = limiter(5, 60_000);
        for _ in 0..5 {
            limiter.admit("test").await;
        }

        let start = Instant::now();
        limiter.admit("test").await;
        let waited = start.elapsed();

        assert!(waited >= Duration::from_secs(60));
        assert!(waited <= Duration::from_millis(60_200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_ever_exceeds_capacity() {
        let limiter = limiter(5, 60_000);
        let mut granted = Vec::new();

        for i in 0..17 {
            limiter.admit("test").await;
            granted.push(Instant::now());
            if i % 3 == 0 {
                tokio::time::advance(Duration::from_secs(7)).await;
            }
        }

        for pair in granted.windows(6) {
            let span = pair[5].duration_since(pair[0]);
            assert!(
                span >= Duration::from_secs(60),
                "six admissions within {:?}",
                span
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_within_denies_over_budget() {
        let limiter = limiter(1, 60_000);
        limiter.admit("first").await;

        let err = limiter
            .admit_within("second", Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            AdmissionError::Denied { caller, retry_after } => {
                assert_eq!(caller, "second");
                assert_eq!(retry_after, Duration::from_millis(60_100));
            }
        }

        // Denial did not consume a slot or advance time.
        assert_eq!(limiter.remaining().await, 0);
        assert_eq!(limiter.status().await.next_slot_in_ms, Some(60_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_within_waits_inside_budget() {
        let limiter = limiter(1, 1_000);
        limiter.admit("first").await;

        let start = Instant::now();
        limiter
            .admit_within("second", Duration::from_secs(2))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_recovers_after_window() {
        let limiter = limiter(3, 1_000);
        limiter.admit("a").await;
        limiter.admit("b").await;
        assert_eq!(limiter.remaining().await, 1);

        tokio::time::advance(Duration::from_millis(1_000)).await;
        assert_eq!(limiter.remaining().await, 3);

        let status = limiter.status().await;
        assert_eq!(status.capacity, 3);
        assert_eq!(status.remaining, 3);
        assert!(status.next_slot_in_ms.is_none());
    }
}
