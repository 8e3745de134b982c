//! Periodic removal of expired rate-limit windows.
//!
//! Only bounds memory; admission decisions do not depend on it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::rate_limit::RateLimiter;

pub struct Sweeper {
    limiter: Arc<dyn RateLimiter>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(limiter: Arc<dyn RateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// One sweep. Returns the number of windows removed.
    pub fn sweep(&self) -> usize {
        let removed = self.limiter.cleanup();
        let remaining = self.limiter.tracked_keys();
        metrics::record_sweep(removed, remaining);

        if removed > 0 {
            tracing::debug!(removed, remaining, "Expired rate-limit windows swept");
        }
        removed
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Rate-limit sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::security::rate_limit::FixedWindowLimiter;

    #[test]
    fn test_sweep_removes_expired() {
        let limiter = Arc::new(FixedWindowLimiter::new(5, Duration::from_millis(1)));
        assert!(limiter.is_allowed("a"));
        assert!(limiter.is_allowed("b"));
        std::thread::sleep(Duration::from_millis(5));

        let sweeper = Sweeper::new(limiter.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep(), 2);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let limiter = Arc::new(FixedWindowLimiter::new(5, Duration::from_secs(60)));
        let sweeper = Sweeper::new(limiter, Duration::from_millis(10));
        let shutdown = Shutdown::new();

        let handle = tokio::spawn(sweeper.run(shutdown.subscribe()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.trigger();

        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
