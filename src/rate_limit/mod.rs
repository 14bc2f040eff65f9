//! Guest-mode rate limiting.
//!
//! A fixed-window counter per client identifier, evaluated lazily on every
//! check. State lives in a [`RateLimitStore`] rather than in this process so
//! that any number of gateway instances enforce one shared cap.

mod memory;
#[cfg(feature = "redis-backend")]
mod redis;
mod store;

pub use memory::{MemoryStore, reaper};
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisStore;
pub use store::{HitOutcome, RateLimitEntry, RateLimitError, RateLimitResult, RateLimitStore};

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

pub const DEFAULT_GUEST_LIMIT: u32 = 5;
pub const DEFAULT_GUEST_WINDOW_SECS: i64 = 24 * 60 * 60;
/// Ten years; keeps `now + window` well inside chrono's range.
pub const MAX_GUEST_WINDOW_SECS: i64 = 10 * 365 * DEFAULT_GUEST_WINDOW_SECS;

pub static LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub static RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window.
    pub limit: u32,
    /// Length of one fixed window.
    pub window: TimeDelta,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_GUEST_LIMIT,
            window: TimeDelta::seconds(DEFAULT_GUEST_WINDOW_SECS),
        }
    }
}

/// Outcome of one check, as consumed by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    fn from_outcome(outcome: HitOutcome, limit: u32) -> Self {
        match outcome {
            HitOutcome::Started { reset_at } => Self {
                allowed: true,
                limit,
                remaining: limit.saturating_sub(1),
                reset_at,
            },
            HitOutcome::Counted { previous, reset_at } => Self {
                allowed: true,
                limit,
                remaining: limit.saturating_sub(previous).saturating_sub(1),
                reset_at,
            },
            HitOutcome::Exhausted { reset_at } => Self {
                allowed: false,
                limit,
                remaining: 0,
                reset_at,
            },
        }
    }

    /// Window end as epoch milliseconds.
    pub fn reset_millis(&self) -> i64 {
        self.reset_at.timestamp_millis()
    }

    /// Write the `X-RateLimit-*` headers.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER.clone(), HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER.clone(), HeaderValue::from(self.remaining));
        headers.insert(RESET_HEADER.clone(), HeaderValue::from(self.reset_millis()));
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// One-time store setup. Safe to call on an already initialized store.
    pub async fn ensure_indexes(&self) -> RateLimitResult<()> {
        self.store.ensure_indexes().await
    }

    /// Count a request from `identifier` against its window.
    ///
    /// Store failures are returned as-is; whether that fails open or closed
    /// is up to the caller.
    pub async fn check_rate_limit(&self, identifier: &str) -> RateLimitResult<RateLimitDecision> {
        self.check_at(identifier, Utc::now()).await
    }

    pub async fn check_at(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> RateLimitResult<RateLimitDecision> {
        let outcome = self
            .store
            .hit(identifier, now, self.config.window, self.config.limit)
            .await?;

        let decision = RateLimitDecision::from_outcome(outcome, self.config.limit);
        debug!(
            identifier,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "rate limit checked"
        );
        Ok(decision)
    }
}
