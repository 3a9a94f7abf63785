//! Contracts for collaborators the core consults but does not own.
//!
//! Persistent storage, rate-limit bookkeeping and broadcast fan-out live behind
//! these traits. Implementations must be safe to call from concurrent handlers.

use std::time::Duration;

use async_trait::async_trait;

use crate::{domain::UserId, Result};

/// Known users and admin identity.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Remember a user. Idempotent.
    async fn record_user(&self, user_id: UserId, username: Option<&str>) -> Result<()>;

    async fn is_admin(&self, user_id: UserId) -> bool;

    async fn user_count(&self) -> usize;

    async fn user_ids(&self) -> Vec<UserId>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitStatus {
    pub remaining: f64,
    pub max: f64,
    pub window: Duration,
}

/// Per-user request quota, consulted before every outbound lookup.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Check the quota and, when allowed, consume one request.
    async fn check(&self, user_id: UserId) -> RateDecision;

    async fn status(&self, user_id: UserId) -> RateLimitStatus;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Admin fan-out of one message to every known user.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, text: &str) -> Result<BroadcastReport>;
}
