use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::UserId,
    ports::{RateDecision, RateLimitStatus, RateLimitStore},
};

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl Bucket {
    /// Tokens available at `now`, capped at `cap`. Does not mutate.
    fn level_at(&self, now: Instant, per_sec: f64, cap: f64) -> f64 {
        let idle = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        (self.tokens + idle * per_sec).min(cap)
    }
}

/// Per-user token bucket: `capacity` lookups per `window`, refilled continuously.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    capacity: f64,
    window: Duration,
    per_sec: f64,
    buckets: HashMap<UserId, Bucket>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            window,
            per_sec: capacity / window.as_secs_f64().max(1e-9),
            buckets: HashMap::new(),
        }
    }

    /// Spend one token for `user_id`, or report how long until one is available.
    pub fn check_at(&mut self, user_id: UserId, now: Instant) -> RateDecision {
        let (per_sec, cap) = (self.per_sec, self.capacity);
        let bucket = self.buckets.entry(user_id).or_insert(Bucket {
            tokens: cap,
            refilled_at: now,
        });
        bucket.tokens = bucket.level_at(now, per_sec, cap);
        bucket.refilled_at = now;

        if bucket.tokens < 1.0 {
            let missing = 1.0 - bucket.tokens;
            return RateDecision::Limited {
                retry_after: Duration::from_secs_f64(missing / per_sec),
            };
        }
        bucket.tokens -= 1.0;
        RateDecision::Allowed
    }

    /// Quota as of `now`; unknown users have a full bucket.
    pub fn status_at(&self, user_id: UserId, now: Instant) -> RateLimitStatus {
        let remaining = self
            .buckets
            .get(&user_id)
            .map_or(self.capacity, |b| b.level_at(now, self.per_sec, self.capacity));
        RateLimitStatus {
            remaining,
            max: self.capacity,
            window: self.window,
        }
    }
}

/// Async, shareable wrapper used by the handlers.
pub struct InMemoryRateLimiter {
    inner: Mutex<RateLimiter>,
}

impl InMemoryRateLimiter {
    pub fn new(max_tokens: u32, window: Duration) -> Self {
        Self {
            inner: Mutex::new(RateLimiter::new(max_tokens, window)),
        }
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimiter {
    async fn check(&self, user_id: UserId) -> RateDecision {
        self.inner.lock().await.check_at(user_id, Instant::now())
    }

    async fn status(&self, user_id: UserId) -> RateLimitStatus {
        self.inner.lock().await.status_at(user_id, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_basic_refill() {
        let start = Instant::now();
        let mut rl = RateLimiter::new(2, Duration::from_secs(10));
        let u = UserId(1);

        assert_eq!(rl.check_at(u, start), RateDecision::Allowed);
        assert_eq!(rl.check_at(u, start), RateDecision::Allowed);
        match rl.check_at(u, start) {
            RateDecision::Limited { retry_after } => {
                assert!((retry_after.as_secs_f64() - 5.0).abs() < 1e-6);
            }
            other => panic!("expected limit, got {other:?}"),
        }

        // 2 tokens / 10s refills one token after 5s.
        assert_eq!(
            rl.check_at(u, start + Duration::from_secs(5)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn users_have_independent_buckets() {
        let now = Instant::now();
        let mut rl = RateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(rl.check_at(UserId(1), now), RateDecision::Allowed);
        assert_eq!(rl.check_at(UserId(2), now), RateDecision::Allowed);
        assert!(matches!(
            rl.check_at(UserId(1), now),
            RateDecision::Limited { .. }
        ));
        assert_eq!(rl.status_at(UserId(3), now).remaining, 1.0);
    }

    #[tokio::test]
    async fn shared_limiter_enforces_quota() {
        let rl = InMemoryRateLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert_eq!(rl.check(UserId(7)).await, RateDecision::Allowed);
        }
        assert!(matches!(
            rl.check(UserId(7)).await,
            RateDecision::Limited { .. }
        ));
        assert!(rl.status(UserId(7)).await.remaining < 1.0);
    }

    #[test]
    fn status_includes_refill_since_last_check() {
        let start = Instant::now();
        let mut rl = RateLimiter::new(4, Duration::from_secs(8));
        for _ in 0..4 {
            assert_eq!(rl.check_at(UserId(9), start), RateDecision::Allowed);
        }
        assert_eq!(rl.status_at(UserId(9), start).remaining, 0.0);

        let later = rl.status_at(UserId(9), start + Duration::from_secs(4));
        assert!((later.remaining - 2.0).abs() < 1e-9);
        assert_eq!(rl.status_at(UserId(9), start + Duration::from_secs(60)).remaining, 4.0);
    }
}
