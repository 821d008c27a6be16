//! Fixed-delay pacing between provider requests

use std::time::Duration;
use tracing::debug;

/// Sleeps between batch items to stay under provider request-rate ceilings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    pub delay: Duration,
    /// Every n-th item (1-based) adds `throttle_pause` on top of `delay`.
    pub throttle_every: Option<usize>,
    pub throttle_pause: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Pacer {
            delay,
            throttle_every: None,
            throttle_pause: Duration::ZERO,
        }
    }

    pub fn with_throttle(mut self, every: usize, pause: Duration) -> Self {
        self.throttle_every = (every > 0).then_some(every);
        self.throttle_pause = pause;
        self
    }

    /// No waiting at all.
    pub fn none() -> Self {
        Pacer::new(Duration::ZERO)
    }

    /// Time to wait after the item at zero-based `index` of `total`.
    pub fn pause_after(&self, index: usize, total: usize) -> Duration {
        if index + 1 >= total {
            return Duration::ZERO;
        }
        match self.throttle_every {
            Some(every) if (index + 1) % every == 0 => self.delay + self.throttle_pause,
            _ => self.delay,
        }
    }

    pub async fn wait_after(&self, index: usize, total: usize) {
        let pause = self.pause_after(index, total);
        if !pause.is_zero() {
            debug!(?pause, "Pacing before next request");
            tokio::time::sleep(pause).await;
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Pacer::new(Duration::from_millis(500))
    }
}
