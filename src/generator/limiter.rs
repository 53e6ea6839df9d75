//! Rolling-window rate limiter for generator calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Allows at most `max_calls` acquisitions in any `window`.
///
/// Waiters queue on the internal mutex, so slots are granted in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1) as usize,
            window,
            grants: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a slot is free, then claim it.
    pub async fn acquire(&self) {
        let mut grants = self.grants.lock().await;

        loop {
            let now = Instant::now();
            while grants
                .front()
                .map_or(false, |granted| now.duration_since(*granted) >= self.window)
            {
                grants.pop_front();
            }

            if grants.len() < self.max_calls {
                grants.push_back(now);
                return;
            }

            // Oldest grant decides when the next slot opens
            let reopen = grants[0] + self.window;
            debug!(
                wait_ms = reopen.saturating_duration_since(now).as_millis() as u64,
                "Rate limit reached, waiting for a slot"
            );
            tokio::time::sleep_until(reopen).await;
        }
    }

    /// Slots available right now without waiting.
    pub async fn available(&self) -> usize {
        let grants = self.grants.lock().await;
        let now = Instant::now();
        let live = grants
            .iter()
            .filter(|granted| now.duration_since(**granted) < self.window)
            .count();
        self.max_calls.saturating_sub(live)
    }
}
