//! Rate limiting for connection attempts.
//!
//! One token bucket is shared by every worker, so the limit applies to the
//! whole scan rather than to each worker.

use governor::{DefaultDirectRateLimiter, Quota};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

/// A rate limiter for connection attempts, cheap to clone.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter allowing `rate` connection attempts per second.
    pub fn new(rate: NonZeroU32) -> Self {
        Self {
            limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(rate))),
        }
    }

    /// Build a limiter from a raw rate, where 0 means unlimited.
    pub fn from_rate(rate: u32) -> Option<Self> {
        NonZeroU32::new(rate).map(Self::new)
    }

    /// Wait until a token is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a token without waiting.
    #[cfg(test)]
    fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_is_unlimited() {
        assert!(RateLimiter::from_rate(0).is_none());
        assert!(RateLimiter::from_rate(10).is_some());
    }

    #[test]
    fn test_burst_is_bounded_by_rate() {
        let limiter = RateLimiter::from_rate(2).unwrap();
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_clones_share_state() {
        let limiter1 = RateLimiter::from_rate(1).unwrap();
        let limiter2 = limiter1.clone();
        assert!(limiter1.try_acquire());
        assert!(!limiter2.try_acquire());
    }

    #[test]
    fn test_wait_with_high_rate() {
        let limiter = RateLimiter::from_rate(1000).unwrap();
        tokio_test::block_on(limiter.wait());
        tokio_test::block_on(limiter.wait());
    }
}
