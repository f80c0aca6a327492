use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// No-data watchdog for the capture stream. The cpal callback feeds it on
/// every buffer; the capture thread's supervision loop polls `is_triggered`
/// and restarts the stream when the device has gone quiet.
#[derive(Clone)]
pub struct WatchdogTimer {
    timeout: Duration,
    last_feed: Arc<RwLock<Instant>>,
}

impl WatchdogTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_feed: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn feed(&self) {
        *self.last_feed.write() = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.last_feed.read().elapsed()
    }

    pub fn is_triggered(&self) -> bool {
        self.elapsed() > self.timeout
    }

    /// Restart the grace period, e.g. after reopening the stream.
    pub fn reset(&self) {
        self.feed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_watchdog_is_not_triggered() {
        let wd = WatchdogTimer::new(Duration::from_secs(5));
        assert!(!wd.is_triggered());
    }

    #[test]
    fn stale_watchdog_triggers_until_fed() {
        let wd = WatchdogTimer::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(wd.is_triggered());
        wd.feed();
        assert!(!wd.is_triggered());
    }
}
