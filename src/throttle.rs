//! Injectable request rate limiting.
//!
//! The limiter is chosen by configuration: [`Permissive`] never throttles and
//! is what test setups use, [`RealCount`] counts requests per key with a
//! `governor` keyed limiter.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DashMapStateStore;
use governor::Quota;

use crate::config::ConfigError;

pub const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub limited: bool,
    pub retry_after: Duration,
}

impl RateDecision {
    pub fn allowed() -> Self {
        Self {
            limited: false,
            retry_after: Duration::ZERO,
        }
    }

    pub fn limited(retry_after: Duration) -> Self {
        Self {
            limited: true,
            retry_after,
        }
    }

    /// Whole seconds a client should wait, rounded up. Suitable for a
    /// `Retry-After` header.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after.as_secs() + u64::from(self.retry_after.subsec_nanos() > 0)
    }
}

pub trait RateLimiter: Send + Sync {
    fn is_rate_limited(&self, key: &str) -> RateDecision;
}

/// Lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct Permissive;

impl RateLimiter for Permissive {
    fn is_rate_limited(&self, _key: &str) -> RateDecision {
        RateDecision::allowed()
    }
}

/// Allows `max_requests` per window for each key, refilling evenly.
///
/// Keys whose budget has fully refilled carry no state worth keeping; they
/// are pruned whenever more than `max_tracked_keys` are held.
#[derive(Debug)]
pub struct RealCount {
    limiter: governor::RateLimiter<String, DashMapStateStore<String>, DefaultClock>,
    clock: DefaultClock,
    max_tracked_keys: usize,
}

impl RealCount {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        let burst = NonZeroU32::new(max_requests)
            .ok_or_else(|| ConfigError::Invalid("rate limit max_requests must be positive".into()))?;
        let quota = Quota::with_period(window / max_requests)
            .ok_or_else(|| ConfigError::Invalid("rate limit window must be positive".into()))?
            .allow_burst(burst);

        let clock = DefaultClock::default();
        Ok(Self {
            limiter: governor::RateLimiter::dashmap_with_clock(quota, &clock),
            clock,
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
        })
    }

    pub fn with_key_limit(mut self, max_tracked_keys: usize) -> Self {
        self.max_tracked_keys = max_tracked_keys;
        self
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    fn evict_idle_keys(&self) {
        if self.limiter.len() > self.max_tracked_keys {
            self.limiter.retain_recent();
            self.limiter.shrink_to_fit();
            tracing::debug!(tracked = self.limiter.len(), "evicted idle rate limit keys");
        }
    }
}

impl RateLimiter for RealCount {
    fn is_rate_limited(&self, key: &str) -> RateDecision {
        let decision = match self.limiter.check_key(&key.to_string()) {
            Ok(()) => RateDecision::allowed(),
            Err(rejected) => {
                let wait = rejected.wait_time_from(self.clock.now());
                tracing::debug!(key, retry_after_ms = wait.as_millis() as u64, "rate limited");
                RateDecision::limited(wait)
            }
        };
        self.evict_idle_keys();
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    const CLIENT: &str = "127.0.0.1";

    #[test]
    fn permissive_allows_rapid_requests() {
        let limiter = Permissive;
        let throttled = (0..1000)
            .filter(|_| limiter.is_rate_limited(CLIENT).limited)
            .count();
        assert_eq!(throttled, 0);
        assert_eq!(limiter.is_rate_limited(CLIENT).retry_after_secs(), 0);
    }

    #[test]
    fn real_count_throttles_rapid_requests() {
        let limiter = RealCount::new(100, Duration::from_secs(60)).unwrap();
        let decisions: Vec<_> = (0..1000).map(|_| limiter.is_rate_limited(CLIENT)).collect();

        assert!(decisions.iter().any(|d| d.limited));
        assert!(!decisions[0].limited);

        let first_limited = decisions.iter().find(|d| d.limited).unwrap();
        assert!(first_limited.retry_after > Duration::ZERO);
        assert!(first_limited.retry_after_secs() >= 1);
    }

    #[test]
    fn keys_are_counted_separately() {
        let limiter = RealCount::new(1, Duration::from_secs(60)).unwrap();

        assert!(!limiter.is_rate_limited("a").limited);
        assert!(limiter.is_rate_limited("a").limited);
        assert!(!limiter.is_rate_limited("b").limited);
    }

    #[test]
    fn idle_keys_are_evicted_past_the_key_limit() {
        let limiter = RealCount::new(2, Duration::from_millis(20))
            .unwrap()
            .with_key_limit(2);

        limiter.is_rate_limited("10.0.0.1");
        limiter.is_rate_limited("10.0.0.2");
        assert_eq!(limiter.tracked_keys(), 2);

        // Both budgets refill completely.
        std::thread::sleep(Duration::from_millis(100));

        limiter.is_rate_limited("10.0.0.3");
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn busy_keys_survive_eviction() {
        let limiter = RealCount::new(1, Duration::from_secs(60))
            .unwrap()
            .with_key_limit(1);

        assert!(!limiter.is_rate_limited("a").limited);
        assert!(!limiter.is_rate_limited("b").limited);
        assert_eq!(limiter.tracked_keys(), 2);
        assert!(limiter.is_rate_limited("a").limited);
    }

    #[test]
    fn rejects_zero_settings() {
        assert!(RealCount::new(0, Duration::from_secs(60)).is_err());
        assert!(RealCount::new(10, Duration::ZERO).is_err());
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(RateDecision::limited(Duration::from_millis(1500)).retry_after_secs(), 2);
        assert_eq!(RateDecision::limited(Duration::from_secs(3)).retry_after_secs(), 3);
    }

    #[test]
    fn config_selects_limiter() {
        let disabled = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        let limiter = disabled.limiter().unwrap();
        assert!((0..1000).all(|_| !limiter.is_rate_limited(CLIENT).limited));

        let enabled = RateLimitConfig {
            enabled: true,
            max_requests: 10,
            ..RateLimitConfig::default()
        };
        let limiter = enabled.limiter().unwrap();
        assert!((0..1000).any(|_| limiter.is_rate_limited(CLIENT).limited));
    }
}
