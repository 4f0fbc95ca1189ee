// ZB-38: Request rate limiting behind an injected, swappable interface.
// Window counters keyed by caller address + path: Redis-backed for
// multi-instance deployments, process-local for single instances and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::db::RedisPool;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Redis connection error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the time window.
    pub max_requests: u32,

    /// Time window in seconds.
    pub window_seconds: u64,
}

impl RateLimitConfig {
    /// Scan endpoints: generous enough for a human, tight enough to blunt
    /// scripted abuse.
    pub fn scan_endpoint() -> Self {
        Self {
            max_requests: 30,
            window_seconds: 60,
        }
    }
}

/// Rate limit check result.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub current_count: u32,
    /// Seconds until the window resets (when blocked).
    pub retry_after: Option<u64>,
}

// =============================================================================
// LIMITER INTERFACE
// =============================================================================

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;
}

// =============================================================================
// IN-MEMORY LIMITER
// =============================================================================

/// Process-local window counters. Suitable for single-instance deployments;
/// counts are lost on restart, which only ever errs permissive.
pub struct MemoryRateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, WindowEntry>>,
}

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

impl MemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let now = Instant::now();
        let window = std::time::Duration::from_secs(self.config.window_seconds);
        let mut windows = self.windows.lock().await;

        // Drop dead windows before the map can grow without bound.
        if windows.len() > 10_000 {
            windows.retain(|_, entry| now.duration_since(entry.window_start) <= window);
        }

        let entry = windows.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.config.max_requests {
            let elapsed = now.duration_since(entry.window_start).as_secs();
            return Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                current_count: entry.count,
                retry_after: Some(self.config.window_seconds.saturating_sub(elapsed).max(1)),
            });
        }

        entry.count += 1;
        Ok(RateLimitResult {
            allowed: true,
            remaining: self.config.max_requests - entry.count,
            current_count: entry.count,
            retry_after: None,
        })
    }
}

// =============================================================================
// REDIS LIMITER
// =============================================================================

/// Distributed window counters with atomic Redis increments; all instances
/// sharing the store enforce one budget.
pub struct RedisRateLimiter {
    pool: RedisPool,
    config: RateLimitConfig,
}

impl RedisRateLimiter {
    pub fn new(pool: RedisPool, config: RateLimitConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let bucket = now / self.config.window_seconds;
        let redis_key = format!("ratelimit:{key}:{bucket}");

        let mut conn = self.pool.connection().await?;
        let count: u32 = conn.incr(&redis_key, 1u32).await?;
        if count == 1 {
            // First hit in this window owns the expiry.
            let _: () = conn
                .expire(&redis_key, self.config.window_seconds as i64)
                .await?;
        }

        if count > self.config.max_requests {
            let window_elapsed = now % self.config.window_seconds;
            return Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                current_count: count,
                retry_after: Some(
                    self.config
                        .window_seconds
                        .saturating_sub(window_elapsed)
                        .max(1),
                ),
            });
        }

        Ok(RateLimitResult {
            allowed: true,
            remaining: self.config.max_requests - count,
            current_count: count,
            retry_after: None,
        })
    }
}
