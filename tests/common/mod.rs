#![allow(dead_code)]

// Shared test fixtures: scripted provider adapters, a fixed narrative
// backend, and an AppState wired entirely with in-memory stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use zerobait_backend_core::services::providers::ProviderAdapter;
use zerobait_backend_core::services::{
    MemoryIntelStore, MemoryRateLimiter, MemoryReportStore, MemoryResultStore, QuickScanService,
    RateLimitConfig, ResultStore,
};
use zerobait_backend_core::models::scan::{
    MalwareListReport, ProviderPayload, ProviderResult, RegistrationReport, TargetScope,
};
use zerobait_backend_core::{
    AppConfig, AppState, NarrativeContext, NarrativeGenerator, ProviderName, ScanService,
    ScanTarget,
};

/// Adapter that always settles to a fixed outcome and counts invocations.
pub struct StaticAdapter {
    pub name: ProviderName,
    pub scope: TargetScope,
    pub outcome: ProviderResult,
    pub calls: AtomicUsize,
}

impl StaticAdapter {
    pub fn new(name: ProviderName, outcome: ProviderResult) -> Arc<Self> {
        let scope = match name {
            ProviderName::Whois | ProviderName::SslLabs => TargetScope::Domain,
            _ => TargetScope::Url,
        };
        Arc::new(Self {
            name,
            scope,
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for StaticAdapter {
    fn name(&self) -> ProviderName {
        self.name
    }
    fn scope(&self) -> TargetScope {
        self.scope
    }
    async fn analyze(&self, _target: &ScanTarget) -> ProviderResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Narrative backend that returns a fixed sentence.
pub struct StaticNarrative {
    pub text: String,
}

impl StaticNarrative {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
        })
    }
}

#[async_trait]
impl NarrativeGenerator for StaticNarrative {
    async fn generate(&self, _context: &NarrativeContext, _screenshot: Option<&str>) -> String {
        self.text.clone()
    }
    fn provider_name(&self) -> &'static str {
        "static"
    }
}

pub fn unavailable() -> ProviderResult {
    ProviderResult::Unavailable
}

pub fn malware_hit() -> ProviderResult {
    let report: MalwareListReport =
        serde_json::from_value(serde_json::json!({ "matches": [{ "threatType": "MALWARE" }] }))
            .unwrap();
    ProviderResult::Success(ProviderPayload::MalwareList(report))
}

pub fn clean_malware_list() -> ProviderResult {
    ProviderResult::Success(ProviderPayload::MalwareList(MalwareListReport::default()))
}

pub fn registration_created(created: &str) -> ProviderResult {
    let report: RegistrationReport = serde_json::from_value(serde_json::json!({
        "WhoisRecord": { "createdDate": created }
    }))
    .unwrap();
    ProviderResult::Success(ProviderPayload::Registration(report))
}

/// ScanService over in-memory storage with the given adapters and narrative.
pub fn scan_service(
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    narrative: Arc<dyn NarrativeGenerator>,
    store: Arc<dyn ResultStore>,
) -> ScanService {
    ScanService::new(adapters, narrative, store, 30)
}

/// Full application state over in-memory stores, for router-level tests.
pub fn test_state(
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    narrative: Arc<dyn NarrativeGenerator>,
    rate_limit: Option<RateLimitConfig>,
) -> AppState {
    let mut config = AppConfig::from_env().expect("config from env");
    config.enable_rate_limiting = rate_limit.is_some();

    let reports = Arc::new(MemoryReportStore::default());
    let quick_adapter: Arc<dyn ProviderAdapter> =
        StaticAdapter::new(ProviderName::SafeBrowsing, clean_malware_list());

    AppState {
        config: Arc::new(config),
        scan_service: Arc::new(scan_service(
            adapters,
            narrative,
            Arc::new(MemoryResultStore::default()),
        )),
        quick_scan: Arc::new(QuickScanService::new(
            Arc::new(MemoryIntelStore::default()),
            reports.clone(),
            quick_adapter,
        )),
        reports,
        rate_limiter: Arc::new(MemoryRateLimiter::new(
            rate_limit.unwrap_or_else(RateLimitConfig::scan_endpoint),
        )),
        redis_pool: None,
    }
}
