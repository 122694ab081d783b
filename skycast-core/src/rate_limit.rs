//! Sliding-window admission control with exponential backoff.
//!
//! Each identifier ("weather", "search", ...) gets its own window of
//! recent request timestamps. Breaching the window cap puts the
//! identifier into a backoff period that doubles with every consecutive
//! violation, capped at a 2^10 multiplier; any allowed request resets the
//! penalty.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default window width: 60 seconds.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default cap: 60 requests per window.
pub const DEFAULT_MAX_REQUESTS: usize = 60;
/// Base penalty for the first violation.
pub const BASE_BACKOFF: Duration = Duration::from_secs(1);

const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// How long to wait before the next attempt, when denied.
    pub retry_after: Option<Duration>,
    /// Requests left in the current window, when allowed.
    pub remaining: usize,
}

#[derive(Debug, Default)]
struct RateLimitState {
    timestamps: Vec<Instant>,
    violation_count: u32,
    backoff_until: Option<Instant>,
}

/// Per-identifier sliding-window rate limiter. One shared instance per
/// process; state mutation is guarded by a mutex.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    base_backoff: Duration,
    states: Mutex<HashMap<String, RateLimitState>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            base_backoff: BASE_BACKOFF,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or deny one request for `identifier`.
    pub fn check(&self, identifier: &str) -> Decision {
        self.check_at(identifier, Instant::now())
    }

    fn check_at(&self, identifier: &str, now: Instant) -> Decision {
        let mut states = self.states.lock();
        let state = states.entry(identifier.to_string()).or_default();

        // An active backoff period denies without touching the window.
        if let Some(until) = state.backoff_until {
            if now < until {
                return Decision {
                    allowed: false,
                    retry_after: Some(until - now),
                    remaining: 0,
                };
            }
        }

        state.timestamps.retain(|t| now.saturating_duration_since(*t) < self.window);

        if state.timestamps.len() >= self.max_requests {
            state.violation_count += 1;
            let exponent = (state.violation_count - 1).min(MAX_BACKOFF_EXPONENT);
            let backoff = self.base_backoff * 2u32.pow(exponent);
            state.backoff_until = Some(now + backoff);

            tracing::debug!(
                identifier,
                violations = state.violation_count,
                backoff_secs = backoff.as_secs(),
                "rate limit exceeded"
            );

            return Decision { allowed: false, retry_after: Some(backoff), remaining: 0 };
        }

        state.timestamps.push(now);
        state.violation_count = 0;
        state.backoff_until = None;

        Decision {
            allowed: true,
            retry_after: None,
            remaining: self.max_requests - state.timestamps.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_cap_then_denies() {
        let limiter = RateLimiter::new(3, Duration::from_millis(1000));
        let t0 = Instant::now();

        for i in 0..3 {
            let d = limiter.check_at("u", t0);
            assert!(d.allowed, "request {i} should be allowed");
            assert_eq!(d.remaining, 2 - i);
        }

        let denied = limiter.check_at("u", t0);
        assert!(!denied.allowed);
        assert!(denied.retry_after.unwrap() > Duration::ZERO);
    }

    #[test]
    fn window_expiry_readmits() {
        let limiter = RateLimiter::new(3, Duration::from_millis(1000));
        let t0 = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("u", t0).allowed);
        }
        assert!(!limiter.check_at("u", t0).allowed);

        // Past the window (and the first-violation backoff), the old
        // timestamps have slid out.
        let later = t0 + Duration::from_millis(1001);
        assert!(limiter.check_at("u", later).allowed);
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check_at("u1", t0).allowed);
        assert!(limiter.check_at("u1", t0).allowed);
        assert!(!limiter.check_at("u1", t0).allowed);

        assert!(limiter.check_at("u2", t0).allowed);
    }

    #[test]
    fn backoff_doubles_per_violation_and_caps() {
        let limiter = RateLimiter::new(1, Duration::from_secs(3600));
        let t0 = Instant::now();
        assert!(limiter.check_at("u", t0).allowed);

        // Each attempt lands just after the previous backoff expires, with
        // the hour-long window still full, so violations accumulate.
        let mut now = t0 + Duration::from_millis(1);
        let mut penalties = Vec::new();
        for _ in 0..12 {
            let d = limiter.check_at("u", now);
            assert!(!d.allowed);
            let backoff = d.retry_after.unwrap();
            penalties.push(backoff);
            now += backoff + Duration::from_millis(1);
        }

        assert!(penalties.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(penalties[0], Duration::from_secs(1));
        assert_eq!(penalties[1], Duration::from_secs(2));
        assert_eq!(penalties[2], Duration::from_secs(4));
        // Exponent is capped at 2^10.
        assert_eq!(penalties[10], Duration::from_secs(1024));
        assert_eq!(penalties[11], Duration::from_secs(1024));
    }

    #[test]
    fn denial_during_backoff_reports_time_left() {
        let limiter = RateLimiter::new(1, Duration::from_secs(3600));
        let t0 = Instant::now();
        assert!(limiter.check_at("u", t0).allowed);

        // First violation: 1s penalty.
        assert!(!limiter.check_at("u", t0).allowed);

        // Re-checking 400ms in reports the remainder, not a new penalty.
        let d = limiter.check_at("u", t0 + Duration::from_millis(400));
        assert!(!d.allowed);
        assert_eq!(d.retry_after.unwrap(), Duration::from_millis(600));
    }

    #[test]
    fn allowed_request_resets_violations() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(limiter.check_at("u", t0).allowed);
        assert!(!limiter.check_at("u", t0).allowed); // violation 1, 1s backoff

        // Window and backoff both expired: admitted, and the violation
        // record clears with it.
        let t1 = t0 + Duration::from_millis(1100);
        assert!(limiter.check_at("u", t1).allowed);

        // The next breach starts over at the base penalty.
        let d = limiter.check_at("u", t1);
        assert!(!d.allowed);
        assert_eq!(d.retry_after.unwrap(), Duration::from_secs(1));
    }
}
