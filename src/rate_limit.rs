use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(1500);
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// Blocking limiter shared by every call to the stats source.
pub struct RequestPacer {
    limiter: DefaultDirectRateLimiter,
    clock: DefaultClock,
    interval: Duration,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(MIN_REQUEST_INTERVAL);
        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(quota),
            clock: DefaultClock::default(),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Blocks the calling thread until the next request may go out.
    pub fn wait(&self) {
        while let Err(not_until) = self.limiter.check() {
            std::thread::sleep(not_until.wait_time_from(self.clock.now()));
        }
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn interval_has_a_floor() {
        let pacer = RequestPacer::new(Duration::from_millis(1));
        assert_eq!(pacer.interval(), MIN_REQUEST_INTERVAL);
    }

    #[test]
    fn second_request_waits_for_the_interval() {
        let pacer = RequestPacer::new(MIN_REQUEST_INTERVAL);
        let start = Instant::now();
        pacer.wait();
        pacer.wait();
        assert!(start.elapsed() >= MIN_REQUEST_INTERVAL - Duration::from_millis(20));
    }
}
