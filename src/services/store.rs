// ZB-37: Storage collaborators behind traits: the 30-day result cache,
// community reports, and remembered threat-intel hits. Redis-backed in
// deployments, in-memory for tests and credential-less runs. Semantics only;
// no schema beyond the stored shapes.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::db::RedisPool;
use crate::models::report::{IntelHit, ReportRecord};
use crate::models::scan::CacheEntry;
use crate::utils::url_normalizer::NormalizedUrl;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        StoreError::Backend(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// The analysis result cache, keyed by normalized URL.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn get(&self, key: &NormalizedUrl) -> Result<Option<CacheEntry>, StoreError>;

    async fn put(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Rewrite a self-healed entry in place, resetting its age. Same write
    /// semantics as `put`; kept separate so callers state their intent.
    async fn touch(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.put(entry).await
    }
}

/// Community reports against a URL.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Append a report; returns the new total for the URL.
    async fn add(&self, key: &NormalizedUrl, report: ReportRecord) -> Result<u64, StoreError>;

    async fn count(&self, key: &NormalizedUrl) -> Result<u64, StoreError>;
}

/// Threat-intel hits remembered per URL so repeat quick scans skip the
/// provider call.
#[async_trait]
pub trait IntelStore: Send + Sync {
    async fn hits(&self, key: &NormalizedUrl) -> Result<Vec<IntelHit>, StoreError>;

    async fn record(&self, key: &NormalizedUrl, hit: &IntelHit) -> Result<(), StoreError>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATIONS
// =============================================================================

#[derive(Default)]
pub struct MemoryResultStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn get(&self, key: &NormalizedUrl) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.read().await.get(key.as_str()).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(entry.key.as_str().to_string(), entry.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<String, Vec<ReportRecord>>>,
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn add(&self, key: &NormalizedUrl, report: ReportRecord) -> Result<u64, StoreError> {
        let mut reports = self.reports.write().await;
        let list = reports.entry(key.as_str().to_string()).or_default();
        list.push(report);
        Ok(list.len() as u64)
    }

    async fn count(&self, key: &NormalizedUrl) -> Result<u64, StoreError> {
        Ok(self
            .reports
            .read()
            .await
            .get(key.as_str())
            .map(|l| l.len() as u64)
            .unwrap_or(0))
    }
}

#[derive(Default)]
pub struct MemoryIntelStore {
    hits: RwLock<HashMap<String, HashMap<String, String>>>,
}

#[async_trait]
impl IntelStore for MemoryIntelStore {
    async fn hits(&self, key: &NormalizedUrl) -> Result<Vec<IntelHit>, StoreError> {
        Ok(self
            .hits
            .read()
            .await
            .get(key.as_str())
            .map(|m| {
                m.iter()
                    .map(|(provider, verdict)| IntelHit {
                        provider: provider.clone(),
                        verdict: verdict.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn record(&self, key: &NormalizedUrl, hit: &IntelHit) -> Result<(), StoreError> {
        self.hits
            .write()
            .await
            .entry(key.as_str().to_string())
            .or_default()
            .insert(hit.provider.clone(), hit.verdict.clone());
        Ok(())
    }
}

// =============================================================================
// REDIS IMPLEMENTATIONS
// =============================================================================

fn result_key(key: &NormalizedUrl) -> String {
    format!("scan:result:{}", key.as_str())
}

fn reports_key(key: &NormalizedUrl) -> String {
    format!("scan:reports:{}", key.as_str())
}

fn intel_key(key: &NormalizedUrl) -> String {
    format!("scan:intel:{}", key.as_str())
}

pub struct RedisResultStore {
    pool: RedisPool,
    /// Entries expire a window after their last write; freshness is still
    /// checked against `created_at` so the rule holds without Redis too.
    ttl_seconds: u64,
}

impl RedisResultStore {
    pub fn new(pool: RedisPool, ttl_days: i64) -> Self {
        Self {
            pool,
            ttl_seconds: (ttl_days.max(1) as u64) * 24 * 60 * 60,
        }
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    async fn get(&self, key: &NormalizedUrl) -> Result<Option<CacheEntry>, StoreError> {
        let mut conn = self.pool.connection().await?;
        let raw: Option<String> = conn.get(result_key(key)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let mut conn = self.pool.connection().await?;
        let json = serde_json::to_string(entry)?;
        let _: () = conn.set_ex(result_key(&entry.key), json, self.ttl_seconds).await?;
        Ok(())
    }
}

pub struct RedisReportStore {
    pool: RedisPool,
}

impl RedisReportStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for RedisReportStore {
    async fn add(&self, key: &NormalizedUrl, report: ReportRecord) -> Result<u64, StoreError> {
        let mut conn = self.pool.connection().await?;
        let json = serde_json::to_string(&report)?;
        let count: u64 = conn.rpush(reports_key(key), json).await?;
        Ok(count)
    }

    async fn count(&self, key: &NormalizedUrl) -> Result<u64, StoreError> {
        let mut conn = self.pool.connection().await?;
        let count: u64 = conn.llen(reports_key(key)).await?;
        Ok(count)
    }
}

pub struct RedisIntelStore {
    pool: RedisPool,
}

impl RedisIntelStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntelStore for RedisIntelStore {
    async fn hits(&self, key: &NormalizedUrl) -> Result<Vec<IntelHit>, StoreError> {
        let mut conn = self.pool.connection().await?;
        let map: HashMap<String, String> = conn.hgetall(intel_key(key)).await?;
        Ok(map
            .into_iter()
            .map(|(provider, verdict)| IntelHit { provider, verdict })
            .collect())
    }

    async fn record(&self, key: &NormalizedUrl, hit: &IntelHit) -> Result<(), StoreError> {
        let mut conn = self.pool.connection().await?;
        let _: () = conn
            .hset(intel_key(key), &hit.provider, &hit.verdict)
            .await?;
        Ok(())
    }
}
