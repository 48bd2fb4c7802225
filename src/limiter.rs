// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter keyed by client address.
//!
//! State is process-local and best-effort: it is lost on restart and never
//! shared across processes. This is a soft protective measure against form
//! abuse, not a security boundary.
//!
//! Eviction is lazy: every check first sweeps out records whose window has
//! elapsed, so no background task is needed. The sweep walks the whole map
//! on each call and distinct-client growth between sweeps is unbounded;
//! acceptable at this service's traffic levels but worth revisiting if it
//! is ever exposed to sustained high-cardinality traffic.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitDecision {
    /// Request is allowed
    Allowed {
        /// Remaining requests in the current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the client's window expires
        retry_after: Duration,
    },
}

/// Per-client window state.
#[derive(Debug)]
struct WindowRecord {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter.
///
/// The window never slides: the first request for a key opens a window, and
/// every request within the configured duration of that instant counts
/// against the same ceiling. Once the window elapses the record is evicted
/// and the next request opens a fresh one.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: RwLock<HashMap<String, WindowRecord>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Check whether a request from `key` is allowed right now.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now()).await
    }

    /// Check whether a request from `key` is allowed at `now`.
    ///
    /// Taking the clock as a parameter keeps window-expiry behavior
    /// deterministic under test.
    pub async fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let window = self.config.window_duration();
        let mut windows = self.windows.write().await;

        // Lazy eviction: drop every record whose window has elapsed before
        // looking at the current key.
        windows.retain(|_, record| now.duration_since(record.window_start) < window);

        match windows.get_mut(key) {
            Some(record) => {
                if record.count >= self.config.max_requests_per_hour {
                    let retry_after =
                        window.saturating_sub(now.duration_since(record.window_start));
                    debug!(client = %key, ?retry_after, "Rate limit exceeded");
                    return RateLimitDecision::Limited { retry_after };
                }
                record.count += 1;
                RateLimitDecision::Allowed {
                    remaining: self.config.max_requests_per_hour - record.count,
                }
            }
            None => {
                windows.insert(
                    key.to_string(),
                    WindowRecord {
                        count: 1,
                        window_start: now,
                    },
                );
                RateLimitDecision::Allowed {
                    remaining: self.config.max_requests_per_hour.saturating_sub(1),
                }
            }
        }
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(ceiling: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests_per_hour: ceiling,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_ceiling_enforced() {
        let limiter = limiter(2);

        assert!(matches!(
            limiter.check("1.2.3.4").await,
            RateLimitDecision::Allowed { remaining: 1 }
        ));
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            RateLimitDecision::Allowed { remaining: 0 }
        ));
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            RateLimitDecision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn test_keys_independent() {
        let limiter = limiter(1);

        assert!(matches!(
            limiter.check("1.2.3.4").await,
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            RateLimitDecision::Limited { .. }
        ));
        assert!(matches!(
            limiter.check("5.6.7.8").await,
            RateLimitDecision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn test_window_elapse_resets() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(matches!(
            limiter.check_at("1.2.3.4", start).await,
            RateLimitDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("1.2.3.4", start).await,
            RateLimitDecision::Limited { .. }
        ));

        // Past the window boundary the old record is evicted and a fresh
        // window opens.
        let later = start + limiter.config.window_duration() + Duration::from_millis(1);
        assert!(matches!(
            limiter.check_at("1.2.3.4", later).await,
            RateLimitDecision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_records_evicted() {
        let limiter = limiter(5);
        let start = Instant::now();

        limiter.check_at("1.2.3.4", start).await;
        limiter.check_at("5.6.7.8", start).await;
        assert_eq!(limiter.tracked_clients().await, 2);

        let later = start + limiter.config.window_duration() + Duration::from_millis(1);
        limiter.check_at("9.9.9.9", later).await;
        // Both stale records swept out; only the fresh key remains.
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn test_retry_after_bounded_by_window() {
        let limiter = limiter(1);
        let start = Instant::now();

        limiter.check_at("1.2.3.4", start).await;
        let decision = limiter
            .check_at("1.2.3.4", start + Duration::from_secs(60))
            .await;
        match decision {
            RateLimitDecision::Limited { retry_after } => {
                assert!(retry_after <= limiter.config.window_duration());
                assert!(retry_after >= limiter.config.window_duration() - Duration::from_secs(60));
            }
            RateLimitDecision::Allowed { .. } => panic!("should be limited"),
        }
    }

    #[tokio::test]
    async fn test_limited_requests_do_not_extend_window() {
        let limiter = limiter(1);
        let start = Instant::now();

        limiter.check_at("1.2.3.4", start).await;
        // Hammering while limited must not refresh the window start.
        for i in 1..5 {
            let now = start + Duration::from_secs(i);
            assert!(matches!(
                limiter.check_at("1.2.3.4", now).await,
                RateLimitDecision::Limited { .. }
            ));
        }
        let later = start + limiter.config.window_duration() + Duration::from_millis(1);
        assert!(matches!(
            limiter.check_at("1.2.3.4", later).await,
            RateLimitDecision::Allowed { .. }
        ));
    }
}
