//! Request pacing for the registry
//!
//! WoRMS has no published quota, so requests are spaced with a token bucket:
//! one token every `interval`, at most `burst` tokens saved up.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// Default spacing between registry requests
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 50;

/// Token-bucket rate limiter shared by every request of one client
pub struct Pacer {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("limited", &self.is_limited())
            .finish()
    }
}

impl Pacer {
    /// A zero interval disables pacing.
    pub fn new(interval: Duration, burst: u32) -> Self {
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let limiter = Quota::with_period(interval)
            .map(|quota| RateLimiter::direct(quota.allow_burst(burst)));

        Self { limiter }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next request may be sent
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_REQUEST_INTERVAL_MS), 1)
    }
}
