// SPDX-License-Identifier: MIT

//! Fixed-window rate limiting keyed by client address.
//!
//! Counters are process-local; horizontal scaling would need an external
//! keyed store behind the same interface (known limitation).

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Fixed-window limiter: at most `max_requests` per key per window.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window_secs: i64, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::seconds(window_secs),
            max_requests,
        }
    }

    /// Count one request for `key`, failing with `RateLimited` once the
    /// window is full. A rejected request does not extend the window.
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        self.check_at(key, Utc::now())
    }

    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_requests {
            tracing::warn!(key, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }

        entry.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(900, 5);
        let now = Utc::now();

        for _ in 0..5 {
            assert!(limiter.check_at("10.0.0.1", now).is_ok());
        }
        let err = limiter.check_at("10.0.0.1", now).unwrap_err();
        assert!(matches!(err, AppError::RateLimited));
    }

    #[test]
    fn test_window_elapse_resets_counter() {
        let limiter = RateLimiter::new(900, 5);
        let now = Utc::now();

        for _ in 0..5 {
            limiter.check_at("10.0.0.1", now).unwrap();
        }
        assert!(limiter.check_at("10.0.0.1", now).is_err());

        let later = now + Duration::seconds(901);
        assert!(limiter.check_at("10.0.0.1", later).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(900, 1);
        let now = Utc::now();

        limiter.check_at("10.0.0.1", now).unwrap();
        assert!(limiter.check_at("10.0.0.1", now).is_err());
        assert!(limiter.check_at("10.0.0.2", now).is_ok());
    }
}
