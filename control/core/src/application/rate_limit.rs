// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Keyed Rate Limiter
//!
//! Admission control over per-credential request budgets. Each credential
//! owns fixed minute/hour/day windows and an in-flight concurrency counter,
//! keyed in a `DashMap` so counters are independently lockable per
//! credential — no global bottleneck.
//!
//! The credential's own rpm/rph and every bound, enabled policy's
//! rpm/rph/rpd/max_concurrent are merged to the tightest budget before
//! admission; all windows share the per-credential counter, so checking the
//! tightest value is equivalent to checking every declared budget.
//!
//! Admission returns an [`InFlightGuard`] whose `Drop` releases the
//! concurrency slot on success, error, or unwind.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::domain::credential::{KeyId, KeyRateLimit};
use crate::domain::error::{AccessError, RateWindow};
use crate::domain::policy::PolicyRateLimits;

/// Window lengths. Shorter lengths are used by tests; production uses the
/// defaults.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub minute: Duration,
    pub hour: Duration,
    pub day: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            minute: Duration::from_secs(60),
            hour: Duration::from_secs(3_600),
            day: Duration::from_secs(86_400),
        }
    }
}

/// The merged admission budget for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateBudget {
    pub per_minute: Option<u32>,
    pub per_hour: Option<u32>,
    pub per_day: Option<u32>,
    pub max_concurrent: Option<u32>,
}

impl RateBudget {
    pub fn from_key(limit: &KeyRateLimit) -> Self {
        Self {
            per_minute: Some(limit.requests_per_minute),
            per_hour: Some(limit.requests_per_hour),
            per_day: None,
            max_concurrent: None,
        }
    }

    /// Narrow this budget by a policy's declarations, keeping the tightest
    /// value per window.
    pub fn tighten(mut self, limits: &PolicyRateLimits) -> Self {
        self.per_minute = min_opt(self.per_minute, limits.requests_per_minute);
        self.per_hour = min_opt(self.per_hour, limits.requests_per_hour);
        self.per_day = min_opt(self.per_day, limits.requests_per_day);
        self.max_concurrent = min_opt(self.max_concurrent, limits.max_concurrent);
        self
    }
}

fn min_opt(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self { started: now, count: 0 }
    }

    fn roll(&mut self, now: Instant, length: Duration) {
        if now.duration_since(self.started) >= length {
            self.started = now;
            self.count = 0;
        }
    }
}

#[derive(Debug)]
struct KeyCounters {
    minute: Window,
    hour: Window,
    day: Window,
    in_flight: u32,
}

impl KeyCounters {
    fn new(now: Instant) -> Self {
        Self {
            minute: Window::new(now),
            hour: Window::new(now),
            day: Window::new(now),
            in_flight: 0,
        }
    }

    fn roll(&mut self, now: Instant, config: &RateLimiterConfig) {
        self.minute.roll(now, config.minute);
        self.hour.roll(now, config.hour);
        self.day.roll(now, config.day);
    }
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    keys: DashMap<KeyId, KeyCounters>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_config(RateLimiterConfig::default())
    }

    pub fn with_config(config: RateLimiterConfig) -> Self {
        Self {
            config,
            keys: DashMap::new(),
        }
    }

    /// Admit one request for `key` under `budget`, incrementing every window
    /// and the concurrency counter. Rejection names the exhausted window so
    /// clients can tell "not allowed" from "allowed but throttled".
    pub fn admit(self: &Arc<Self>, key: KeyId, budget: &RateBudget) -> Result<InFlightGuard, AccessError> {
        let now = Instant::now();
        let mut counters = self.keys.entry(key).or_insert_with(|| KeyCounters::new(now));
        counters.roll(now, &self.config);

        let exhausted = [
            (budget.per_minute, counters.minute.count, RateWindow::Minute),
            (budget.per_hour, counters.hour.count, RateWindow::Hour),
            (budget.per_day, counters.day.count, RateWindow::Day),
            (budget.max_concurrent, counters.in_flight, RateWindow::Concurrent),
        ]
        .into_iter()
        .find_map(|(limit, used, window)| match limit {
            Some(limit) if used >= limit => Some(window),
            _ => None,
        });
        if let Some(window) = exhausted {
            tracing::warn!(key_id = %key, %window, "rate limit admission rejected");
            return Err(AccessError::RateLimited { window });
        }

        counters.minute.count += 1;
        counters.hour.count += 1;
        counters.day.count += 1;
        counters.in_flight += 1;
        drop(counters);

        Ok(InFlightGuard {
            limiter: Arc::clone(self),
            key,
        })
    }

    /// Current in-flight count for a credential. Zero when untracked.
    pub fn in_flight(&self, key: &KeyId) -> u32 {
        self.keys.get(key).map(|c| c.in_flight).unwrap_or(0)
    }

    fn release(&self, key: &KeyId) {
        if let Some(mut counters) = self.keys.get_mut(key) {
            counters.in_flight = counters.in_flight.saturating_sub(1);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped concurrency acquisition. Dropping the guard releases the slot
/// regardless of how the request ended.
pub struct InFlightGuard {
    limiter: Arc<RateLimiter>,
    key: KeyId,
}

impl std::fmt::Debug for InFlightGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightGuard").field("key", &self.key).finish()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.limiter.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> RateLimiterConfig {
        RateLimiterConfig {
            minute: Duration::from_millis(50),
            hour: Duration::from_millis(200),
            day: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_minute_window_exhaustion_and_reset() {
        let limiter = Arc::new(RateLimiter::with_config(fast_config()));
        let key = KeyId::new();
        let budget = RateBudget {
            per_minute: Some(2),
            ..Default::default()
        };

        let _a = limiter.admit(key, &budget).unwrap();
        let _b = limiter.admit(key, &budget).unwrap();
        let err = limiter.admit(key, &budget).unwrap_err();
        assert!(matches!(err, AccessError::RateLimited { window: RateWindow::Minute }));

        // After the window elapses the budget refills
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.admit(key, &budget).is_ok());
    }

    #[test]
    fn test_concurrency_guard_releases_on_drop() {
        let limiter = Arc::new(RateLimiter::new());
        let key = KeyId::new();
        let budget = RateBudget {
            max_concurrent: Some(1),
            ..Default::default()
        };

        let guard = limiter.admit(key, &budget).unwrap();
        assert_eq!(limiter.in_flight(&key), 1);
        let err = limiter.admit(key, &budget).unwrap_err();
        assert!(matches!(err, AccessError::RateLimited { window: RateWindow::Concurrent }));

        drop(guard);
        assert_eq!(limiter.in_flight(&key), 0);
        assert!(limiter.admit(key, &budget).is_ok());
    }

    #[test]
    fn test_keys_tracked_independently() {
        let limiter = Arc::new(RateLimiter::new());
        let budget = RateBudget {
            per_minute: Some(1),
            ..Default::default()
        };

        let k1 = KeyId::new();
        let k2 = KeyId::new();
        let _g1 = limiter.admit(k1, &budget).unwrap();
        assert!(limiter.admit(k1, &budget).is_err());
        // k2 has its own quota
        assert!(limiter.admit(k2, &budget).is_ok());
    }

    #[test]
    fn test_budget_merges_to_tightest() {
        let key_budget = RateBudget::from_key(&KeyRateLimit {
            requests_per_minute: 60,
            requests_per_hour: 1_000,
        });
        let merged = key_budget.tighten(&PolicyRateLimits {
            requests_per_minute: Some(10),
            requests_per_hour: None,
            requests_per_day: Some(5_000),
            max_concurrent: Some(4),
        });
        assert_eq!(merged.per_minute, Some(10));
        assert_eq!(merged.per_hour, Some(1_000));
        assert_eq!(merged.per_day, Some(5_000));
        assert_eq!(merged.max_concurrent, Some(4));
    }

    #[test]
    fn test_unlimited_budget_always_admits() {
        let limiter = Arc::new(RateLimiter::new());
        let key = KeyId::new();
        let budget = RateBudget::default();
        for _ in 0..100 {
            let _ = limiter.admit(key, &budget).unwrap();
        }
    }
}
