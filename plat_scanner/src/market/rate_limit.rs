//! Minimum spacing between market requests

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// About three requests per second, the market's published ceiling
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(334);

/// Shared gate that every price lookup passes through.
///
/// The first caller goes straight through; later callers wait until
/// `min_interval` has elapsed since the previous one was let through.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Wait for this caller's slot
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                log::debug!("Rate limit: waiting {}ms", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
