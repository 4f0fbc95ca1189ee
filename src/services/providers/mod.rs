// ZB-35: Provider adapters and the fan-out orchestrator.
// Every adapter wraps one external call behind a uniform, infallible
// contract: it settles to a ProviderResult and never raises past its own
// boundary. The fan-out launches all applicable adapters concurrently and
// waits for every one of them.

pub mod safe_browsing;
pub mod ssllabs;
pub mod urlscan;
pub mod virustotal;
pub mod whoisxml;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::scan::{ProviderName, ProviderResult, RawResults, ScanTarget, TargetScope};

pub use safe_browsing::SafeBrowsingClient;
pub use ssllabs::SslLabsClient;
pub use urlscan::UrlscanClient;
pub use virustotal::VirusTotalClient;
pub use whoisxml::WhoisXmlClient;

/// One external intelligence source. Implementations own their timeout and
/// cancellation; `analyze` must settle, never panic or error out.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> ProviderName;

    /// Whether the adapter needs the full URL or just the domain. The
    /// fan-out skips domain-scoped adapters when no domain exists.
    fn scope(&self) -> TargetScope {
        TargetScope::Url
    }

    async fn analyze(&self, target: &ScanTarget) -> ProviderResult;
}

/// Launch all applicable adapters concurrently and collect a keyed bag of
/// their outcomes. Settle-all: a slow or failing provider never discards the
/// others' results. Inapplicable adapters are omitted from the bag entirely.
pub async fn fan_out(adapters: &[Arc<dyn ProviderAdapter>], target: &ScanTarget) -> RawResults {
    let applicable: Vec<&Arc<dyn ProviderAdapter>> = adapters
        .iter()
        .filter(|a| a.scope() == TargetScope::Url || target.domain.is_some())
        .collect();

    let settled = join_all(applicable.iter().map(|a| a.analyze(target))).await;

    let mut results = RawResults::default();
    for (adapter, outcome) in applicable.iter().zip(settled) {
        results.insert(adapter.name(), outcome);
    }
    results
}

// =============================================================================
// SHARED TRANSPORT HELPERS
// =============================================================================

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status(404))
    }
}

/// Issue a request with a hard timeout and decode the JSON body. Non-2xx
/// statuses and undecodable bodies are both failures; timeouts surface as
/// transport failures.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    builder: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<T, FetchError> {
    let response = builder
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::InvalidJson(e.to_string()))
}

/// HTTP client shared by the adapters; per-request timeouts are applied at
/// call sites since every provider has its own budget.
pub(crate) fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("zerobait-scanner/1.0")
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_default()
}
