// Library exports for the ZeroBait backend core
// This file exposes modules and functions for library consumers

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use db::{RedisConfig, RedisPool};
pub use models::scan::{
    AnalysisResult, CacheEntry, ProviderName, ProviderPayload, ProviderResult, RawResults,
    ScanTarget, SeverityTier,
};
pub use services::{
    GeminiGenerator, MemoryRateLimiter, NarrativeContext, NarrativeGenerator, QuickScanService,
    RateLimitConfig, RateLimiter, ScanError, ScanService,
};
pub use utils::{normalize, NormalizedUrl};

use std::sync::Arc;
use tracing::info;

use services::providers::{
    ProviderAdapter, SafeBrowsingClient, SslLabsClient, UrlscanClient, VirusTotalClient,
    WhoisXmlClient,
};
use services::{
    IntelStore, MemoryIntelStore, MemoryReportStore, MemoryResultStore, RedisIntelStore,
    RedisRateLimiter, RedisReportStore, RedisResultStore, ReportStore, ResultStore,
};

// Library initialization function for external consumers: wires the stores,
// the provider adapters and the services from CONFIG.
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // Load environment
    dotenv::dotenv().ok();

    let config = CONFIG.clone();

    let rate_limit_config = RateLimitConfig {
        max_requests: config.rate_limit_max_requests,
        window_seconds: config.rate_limit_window_seconds,
    };

    // Storage backends: Redis when configured, process-local otherwise.
    let (redis_pool, result_store, report_store, intel_store, rate_limiter): (
        Option<RedisPool>,
        Arc<dyn ResultStore>,
        Arc<dyn ReportStore>,
        Arc<dyn IntelStore>,
        Arc<dyn RateLimiter>,
    ) = match &config.redis_url {
        Some(url) => {
            info!("Initializing Redis pool...");
            let redis_config = RedisConfig {
                redis_url: url.clone(),
                ..RedisConfig::from_env()
            };
            let pool = RedisPool::new(redis_config).await?;
            (
                Some(pool.clone()),
                Arc::new(RedisResultStore::new(pool.clone(), config.scan_cache_ttl_days)),
                Arc::new(RedisReportStore::new(pool.clone())),
                Arc::new(RedisIntelStore::new(pool.clone())),
                Arc::new(RedisRateLimiter::new(pool, rate_limit_config)),
            )
        },
        None => {
            info!("REDIS_URL not set, using in-memory stores");
            (
                None,
                Arc::new(MemoryResultStore::default()),
                Arc::new(MemoryReportStore::default()),
                Arc::new(MemoryIntelStore::default()),
                Arc::new(MemoryRateLimiter::new(rate_limit_config)),
            )
        },
    };

    // Provider adapters; a missing credential just means Unavailable.
    let safe_browsing = Arc::new(SafeBrowsingClient::new(config.safe_browsing_api_key.clone()));
    let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
        Arc::new(VirusTotalClient::new(config.virustotal_api_key.clone())),
        safe_browsing.clone(),
        Arc::new(WhoisXmlClient::new(config.whoisxml_api_key.clone())),
        Arc::new(SslLabsClient::new()),
        Arc::new(UrlscanClient::new(config.urlscan_api_key.clone())),
    ];

    let narrative = Arc::new(GeminiGenerator::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));

    let scan_service = Arc::new(ScanService::new(
        adapters,
        narrative,
        result_store,
        config.scan_cache_ttl_days,
    ));
    let quick_scan = Arc::new(QuickScanService::new(
        intel_store,
        report_store.clone(),
        safe_browsing,
    ));

    Ok(AppState {
        config: Arc::new(config),
        scan_service,
        quick_scan,
        reports: report_store,
        rate_limiter,
        redis_pool,
    })
}
