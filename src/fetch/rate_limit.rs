//! Sliding-window rate limiting for outbound metadata requests
//!
//! The limiter is shared by cloning: every clone gates on the same window, so
//! one instance handed to every fetcher caps the whole process.

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// At most `max_calls` acquisitions in any window of length `period`
#[derive(Clone, Debug)]
pub struct RateLimiter {
    /// Start instants of the calls still inside the window
    window: Arc<Mutex<VecDeque<Instant>>>,
    /// Calls allowed per window
    max_calls: usize,
    /// Window length
    period: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `max_calls` per `period`
    ///
    /// A `max_calls` of zero is clamped to one; `Config::validate` rejects it
    /// before it gets here.
    #[must_use]
    pub fn new(max_calls: u32, period: Duration) -> Self {
        let max_calls = max_calls.max(1) as usize;
        Self {
            window: Arc::new(Mutex::new(VecDeque::with_capacity(max_calls))),
            max_calls,
            period,
        }
    }

    /// Create a limiter from configuration
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_calls, config.period)
    }

    /// Wait until a call is allowed, then record it
    ///
    /// The lock is held while waiting, so waiters are admitted in arrival order
    /// and the window can never be overfilled by a burst of concurrent callers.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = window.front() {
                if now.duration_since(oldest) >= self.period {
                    window.pop_front();
                } else {
                    break;
                }
            }

            if window.len() < self.max_calls {
                window.push_back(now);
                return;
            }

            if let Some(&oldest) = window.front() {
                let wait = self.period.saturating_sub(now.duration_since(oldest));
                tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Calls allowed per window
    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Window length
    pub fn period(&self) -> Duration {
        self.period
    }
}
