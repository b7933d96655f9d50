//! Per-user unlock attempt limiting (fixed one-minute window).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use keepsake_common::constants::redis_keys::UNLOCK_RATELIMIT_PREFIX;
use keepsake_common::{KeepsakeError, Result};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

/// Counts unlock requests per user
#[async_trait]
pub trait UnlockLimiter: Send + Sync {
    /// Record one request; returns (allowed, remaining in window)
    async fn hit(&self, user_id: &str) -> Result<(bool, u32)>;
}

/// Redis INCR/EXPIRE window counter
pub struct RedisUnlockLimiter {
    redis: ConnectionManager,
    max_per_minute: u32,
}

impl RedisUnlockLimiter {
    pub fn new(redis: ConnectionManager, max_per_minute: u32) -> Self {
        Self {
            redis,
            max_per_minute,
        }
    }
}

#[async_trait]
impl UnlockLimiter for RedisUnlockLimiter {
    async fn hit(&self, user_id: &str) -> Result<(bool, u32)> {
        let mut conn = self.redis.clone();
        let key = format!("{}{}", UNLOCK_RATELIMIT_PREFIX, user_id);

        let count: u32 = conn
            .incr(&key, 1)
            .await
            .map_err(|e| KeepsakeError::Store(e.to_string()))?;

        // Set expiry on first request
        if count == 1 {
            conn.expire::<_, ()>(&key, WINDOW.as_secs() as i64)
                .await
                .map_err(|e| KeepsakeError::Store(e.to_string()))?;
        }

        Ok(window_verdict(count, self.max_per_minute))
    }
}

/// In-process window counter. Expired windows are dropped on each hit.
pub struct MemoryUnlockLimiter {
    windows: Mutex<HashMap<String, (Instant, u32)>>,
    max_per_minute: u32,
    window: Duration,
}

impl MemoryUnlockLimiter {
    pub fn new(max_per_minute: u32) -> Self {
        Self::with_window(max_per_minute, WINDOW)
    }

    fn with_window(max_per_minute: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_per_minute,
            window,
        }
    }
}

#[async_trait]
impl UnlockLimiter for MemoryUnlockLimiter {
    async fn hit(&self, user_id: &str) -> Result<(bool, u32)> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        windows.retain(|_, (start, _)| now.duration_since(*start) < self.window);

        let entry = windows.entry(user_id.to_string()).or_insert((now, 0));
        entry.1 = entry.1.saturating_add(1);

        Ok(window_verdict(entry.1, self.max_per_minute))
    }
}

fn window_verdict(count: u32, max: u32) -> (bool, u32) {
    let allowed = count <= max;
    let remaining = if allowed { max - count } else { 0 };
    (allowed, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_limiter_window() {
        let limiter = MemoryUnlockLimiter::new(2);

        assert_eq!(limiter.hit("u1").await.unwrap(), (true, 1));
        assert_eq!(limiter.hit("u1").await.unwrap(), (true, 0));
        assert_eq!(limiter.hit("u1").await.unwrap(), (false, 0));

        // Other users have their own window
        assert_eq!(limiter.hit("u2").await.unwrap(), (true, 1));
    }

    #[tokio::test]
    async fn test_memory_limiter_drops_expired_windows() {
        let limiter = MemoryUnlockLimiter::with_window(2, Duration::from_millis(50));

        limiter.hit("u1").await.unwrap();
        limiter.hit("u1").await.unwrap();
        limiter.hit("u2").await.unwrap();
        assert_eq!(limiter.windows.lock().await.len(), 2);

        tokio::time::sleep(Duration::from_millis(80)).await;

        // A fresh window for u1, and u2's stale entry is gone
        assert_eq!(limiter.hit("u1").await.unwrap(), (true, 1));
        let windows = limiter.windows.lock().await;
        assert_eq!(windows.len(), 1);
        assert!(windows.contains_key("u1"));
    }
}
