//! Redis-backed counter store for multi-instance deployments.
//!
//! Each identifier is one hash (`count`, `reset_at` in epoch ms). The whole
//! fixed-window decision runs in a Lua script, so Redis serializes concurrent
//! hits. Keys carry `PEXPIREAT reset_at`, letting Redis reclaim abandoned
//! counters without a sweep.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use redis::Script;
use redis::aio::ConnectionManager;
use tracing::info;

use super::store::{HitOutcome, RateLimitEntry, RateLimitError, RateLimitResult, RateLimitStore};

/// Key prefix for rate limit data in Redis.
const KEY_PREFIX: &str = "tripguide:ratelimit:";

/// Returns `{kind, count_before, reset_at_ms}`.
/// kind: 0 = window started, 1 = counted, 2 = exhausted.
const HIT_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])

local count = tonumber(redis.call('HGET', key, 'count'))
local reset_at = tonumber(redis.call('HGET', key, 'reset_at'))

if count == nil or reset_at == nil or reset_at <= now_ms then
    reset_at = now_ms + window_ms
    redis.call('HSET', key, 'count', 1, 'reset_at', reset_at)
    redis.call('PEXPIREAT', key, reset_at)
    return {0, 0, reset_at}
end

if count >= limit then
    return {2, count, reset_at}
end

redis.call('HINCRBY', key, 'count', 1)
return {1, count, reset_at}
"#;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    script: Script,
}

impl RedisStore {
    /// Connect to Redis, e.g. `redis://localhost:6379`.
    pub async fn connect(redis_url: &str) -> RateLimitResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| RateLimitError::Database(format!("Redis connection error: {}", e)))?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            RateLimitError::Unavailable(format!("Redis connection manager error: {}", e))
        })?;

        Ok(Self {
            conn,
            script: Script::new(HIT_SCRIPT),
        })
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", KEY_PREFIX, id)
    }
}

fn from_millis(ms: i64) -> RateLimitResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| RateLimitError::Database(format!("reset_at out of range: {}", ms)))
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn ensure_indexes(&self) -> RateLimitResult<()> {
        // Uniqueness is the key itself and expiry is set per key by the hit
        // script, so initialization only has to prove the server is reachable.
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| RateLimitError::Unavailable(e.to_string()))?;

        info!("redis rate limit store ready");
        Ok(())
    }

    async fn get(&self, id: &str) -> RateLimitResult<Option<RateLimitEntry>> {
        let mut conn = self.conn.clone();

        let fields: Vec<Option<i64>> = redis::cmd("HMGET")
            .arg(self.key(id))
            .arg("count")
            .arg("reset_at")
            .query_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Database(e.to_string()))?;

        match fields.as_slice() {
            [Some(count), Some(reset_at)] => Ok(Some(RateLimitEntry {
                id: id.to_string(),
                count: (*count).max(0) as u32,
                reset_at: from_millis(*reset_at)?,
            })),
            _ => Ok(None),
        }
    }

    async fn hit(
        &self,
        id: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
        limit: u32,
    ) -> RateLimitResult<HitOutcome> {
        let mut conn = self.conn.clone();

        let reply: Vec<i64> = self
            .script
            .key(self.key(id))
            .arg(now.timestamp_millis())
            .arg(window.num_milliseconds())
            .arg(limit)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Database(e.to_string()))?;

        let [kind, count, reset_at_ms] = reply.as_slice() else {
            return Err(RateLimitError::Database(format!(
                "unexpected hit script reply: {:?}",
                reply
            )));
        };
        let reset_at = from_millis(*reset_at_ms)?;

        match *kind {
            0 => Ok(HitOutcome::Started { reset_at }),
            1 => Ok(HitOutcome::Counted {
                previous: (*count).max(0) as u32,
                reset_at,
            }),
            2 => Ok(HitOutcome::Exhausted { reset_at }),
            other => Err(RateLimitError::Database(format!(
                "unknown hit script outcome: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_url_is_an_error_not_a_panic() {
        let err = RedisStore::connect("not a redis url").await.err().unwrap();
        assert!(matches!(err, RateLimitError::Database(_)));
    }
}
