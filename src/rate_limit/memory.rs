//! In-process counter store for single-instance deployments and tests.
//!
//! Counters live in a DashMap keyed by identifier. `hit` runs while holding the
//! entry's shard lock, so the decision and the write cannot interleave with
//! another caller for the same identifier.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use super::store::{HitOutcome, RateLimitEntry, RateLimitResult, RateLimitStore};

#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, RateLimitEntry>,
    indexed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry whose window has ended. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Seed or overwrite an entry directly.
    pub fn insert(&self, entry: RateLimitEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn ensure_indexes(&self) -> RateLimitResult<()> {
        // Keys are unique by construction; expiry is handled by `reaper`.
        if !self.indexed.swap(true, Ordering::Relaxed) {
            debug!("memory rate limit store initialized");
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> RateLimitResult<Option<RateLimitEntry>> {
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    async fn hit(
        &self,
        id: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
        limit: u32,
    ) -> RateLimitResult<HitOutcome> {
        let outcome = match self.entries.entry(id.to_string()) {
            Entry::Vacant(slot) => {
                let entry = RateLimitEntry::open(id, now, window);
                let reset_at = entry.reset_at;
                slot.insert(entry);
                HitOutcome::Started { reset_at }
            }
            Entry::Occupied(mut slot) => slot.get_mut().register_hit(now, window, limit),
        };
        Ok(outcome)
    }
}

/// Periodically reclaim expired counters.
/// Correctness never depends on this running; it only bounds memory.
pub async fn reaper(store: Arc<MemoryStore>, sweep_interval: Duration) {
    let mut interval = interval(sweep_interval);

    info!(interval = ?sweep_interval, "rate limit reaper started");

    loop {
        interval.tick().await;

        let removed = store.purge_expired(Utc::now());
        if removed > 0 {
            debug!(removed, remaining = store.len(), "purged expired rate limit entries");
        }
    }
}
