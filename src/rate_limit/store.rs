//! Counter store contract for the guest rate limiter.
//!
//! A store owns the per-identifier fixed-window counters. Every mutation goes
//! through [`RateLimitStore::hit`], which must decide and apply the outcome as
//! one atomic operation so concurrent callers can never both observe a free
//! slot and both take it.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

/// Result type for counter store operations.
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Errors from counter store operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Usage of one identifier within its current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub id: String,
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    /// A window opened by the first request at `now`.
    pub fn open(id: &str, now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            id: id.to_string(),
            count: 1,
            reset_at: now + window,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.reset_at <= now
    }

    /// Apply one request to an existing entry.
    ///
    /// An expired window is replaced outright (the stale count is dropped).
    /// An exhausted live window is left untouched.
    pub fn register_hit(
        &mut self,
        now: DateTime<Utc>,
        window: TimeDelta,
        limit: u32,
    ) -> HitOutcome {
        if self.is_expired(now) {
            self.count = 1;
            self.reset_at = now + window;
            return HitOutcome::Started {
                reset_at: self.reset_at,
            };
        }

        if self.count >= limit {
            return HitOutcome::Exhausted {
                reset_at: self.reset_at,
            };
        }

        let previous = self.count;
        self.count += 1;
        HitOutcome::Counted {
            previous,
            reset_at: self.reset_at,
        }
    }
}

/// What a single atomic hit did to the stored counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// A new window was opened with `count = 1` (first request or expired window).
    Started { reset_at: DateTime<Utc> },
    /// The live window was incremented from `previous`.
    Counted {
        previous: u32,
        reset_at: DateTime<Utc>,
    },
    /// The live window is full; nothing was written.
    Exhausted { reset_at: DateTime<Utc> },
}

/// Persistent, shared storage for fixed-window counters.
///
/// Implementations must be safe to call from many handler instances at once,
/// including instances in other processes when the store is external.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Declare identifier uniqueness and expiry on `reset_at`.
    /// Must succeed when called again on an already initialized store.
    async fn ensure_indexes(&self) -> RateLimitResult<()>;

    /// Point lookup by identifier. Expired entries may still be returned.
    async fn get(&self, id: &str) -> RateLimitResult<Option<RateLimitEntry>>;

    /// Insert-if-absent, reset-if-expired, increment-if-under-limit, or
    /// leave-if-exhausted, as one atomic operation.
    async fn hit(
        &self,
        id: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
        limit: u32,
    ) -> RateLimitResult<HitOutcome>;
}
