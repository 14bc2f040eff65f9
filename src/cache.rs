use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::debug;

use crate::metrics::CACHE_SIZE;
use crate::models::{GenerateRequest, GenerateResponse};

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub response: GenerateResponse,
    pub created_at: Instant,
}

// Model responses keyed by prompt hash
pub struct GuideCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl GuideCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    // Fresh entry or nothing; stale entries are dropped on read
    pub fn get(&self, key: &str) -> Option<GenerateResponse> {
        let fresh = self.entries.get(key).and_then(|entry| {
            (entry.created_at.elapsed() < self.ttl).then(|| entry.response.clone())
        });
        if fresh.is_none() && self.entries.remove(key).is_some() {
            CACHE_SIZE.set(self.entries.len() as f64);
        }
        fresh
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        CACHE_SIZE.set(self.entries.len() as f64);
        before.saturating_sub(self.entries.len())
    }

    pub fn insert(&self, key: String, response: GenerateResponse) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                response,
                created_at: Instant::now(),
            },
        );
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Periodically drop responses for prompts nobody asks for again
pub async fn cache_sweeper(cache: Arc<GuideCache>, sweep_interval: Duration) {
    let mut interval = interval(sweep_interval);

    loop {
        interval.tick().await;

        let removed = cache.purge_expired();
        if removed > 0 {
            debug!(removed, remaining = cache.len(), "purged stale cache entries");
        }
    }
}

// Create a cache key (hash of model + prompt)
pub fn make_cache_key(req: &GenerateRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&req.model);
    hasher.update([0u8]);
    hasher.update(&req.prompt);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(text: &str) -> GenerateResponse {
        GenerateResponse {
            model: "llama3.2".into(),
            response: text.into(),
        }
    }

    #[test]
    fn key_depends_on_model_and_prompt() {
        let a = GenerateRequest::new("llama3.2", "Goa".into());
        let b = GenerateRequest::new("mistral", "Goa".into());
        let c = GenerateRequest::new("llama3.2", "Goa".into());

        assert_ne!(make_cache_key(&a), make_cache_key(&b));
        assert_eq!(make_cache_key(&a), make_cache_key(&c));
    }

    #[test]
    fn hit_within_ttl() {
        let cache = GuideCache::new(Duration::from_secs(60));
        cache.insert("k".into(), response("{}"));

        assert_eq!(cache.get("k").unwrap().response, "{}");
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn stale_entries_are_swept_without_being_read() {
        let cache = GuideCache::new(Duration::from_millis(20));
        cache.insert("old".into(), response("{}"));
        std::thread::sleep(Duration::from_millis(40));
        cache.insert("new".into(), response("{}"));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn stale_read_removes_the_entry() {
        let cache = GuideCache::new(Duration::from_millis(20));
        cache.insert("k".into(), response("{}"));
        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = GuideCache::new(Duration::ZERO);
        cache.insert("k".into(), response("{}"));

        assert!(cache.is_empty());
        assert!(cache.get("k").is_none());
    }
}
