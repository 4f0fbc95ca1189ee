// URL-reputation adapter (VirusTotal), submit-and-poll protocol.
// The provider only holds verdicts for previously-seen URLs: a 404 on the
// direct lookup means "no opinion yet", not failure. We then submit the URL
// and poll briefly, alternating between the analysis-by-id endpoint and the
// canonical lookup, and give up with Pending once the budget is spent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

use crate::models::scan::{
    ProviderName, ProviderPayload, ProviderResult, ReputationReport, ReputationStats, ScanTarget,
};
use crate::services::providers::{build_http_client, fetch_json, FetchError, ProviderAdapter};

const BASE_URL: &str = "https://www.virustotal.com/api/v3";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(12);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);
const POLL_ATTEMPTS: u32 = 3;
const POLL_DELAY: Duration = Duration::from_millis(2500);

/// Transport seam for the submit-and-poll protocol so the state machine is
/// testable without a network or a fake clock.
#[async_trait]
pub(crate) trait ReputationTransport: Send + Sync {
    /// Direct verdict lookup by content-derived identifier.
    async fn lookup(&self, id: &str) -> Result<ReputationReport, FetchError>;

    /// Submit the URL for asynchronous analysis; returns the job id when the
    /// provider handed one out.
    async fn submit(&self, url: &str) -> Result<Option<String>, FetchError>;

    /// Check an analysis job; `Some` once a usable stats object exists.
    async fn analysis(&self, id: &str) -> Result<Option<ReputationStats>, FetchError>;
}

pub struct VirusTotalClient {
    transport: Option<Arc<dyn ReputationTransport>>,
    poll_attempts: u32,
    poll_delay: Duration,
}

impl VirusTotalClient {
    pub fn new(api_key: Option<String>) -> Self {
        let transport = api_key.map(|key| {
            Arc::new(HttpTransport {
                http: build_http_client(),
                api_key: key,
            }) as Arc<dyn ReputationTransport>
        });
        Self {
            transport,
            poll_attempts: POLL_ATTEMPTS,
            poll_delay: POLL_DELAY,
        }
    }

    #[cfg(test)]
    fn with_transport(
        transport: Arc<dyn ReputationTransport>,
        poll_attempts: u32,
        poll_delay: Duration,
    ) -> Self {
        Self {
            transport: Some(transport),
            poll_attempts,
            poll_delay,
        }
    }

    async fn submit_and_poll(
        &self,
        transport: &Arc<dyn ReputationTransport>,
        url: &str,
        id: &str,
    ) -> ProviderResult {
        let analysis_id = match transport.submit(url).await {
            Ok(analysis_id) => analysis_id,
            Err(e) => return ProviderResult::Failed(format!("submission failed: {e}")),
        };

        for attempt in 0..self.poll_attempts {
            sleep(self.poll_delay).await;

            // The job endpoint usually answers first; poll errors are not
            // terminal, the next attempt may still resolve.
            if let Some(analysis_id) = &analysis_id {
                if let Ok(Some(stats)) = transport.analysis(analysis_id).await {
                    return ProviderResult::Success(ProviderPayload::Reputation(
                        ReputationReport::from_stats(stats),
                    ));
                }
            }

            match transport.lookup(id).await {
                Ok(report) if report.has_stats() => {
                    return ProviderResult::Success(ProviderPayload::Reputation(report));
                }
                Ok(_) => debug!("reputation verdict not ready (attempt {})", attempt + 1),
                Err(e) => debug!("reputation poll failed (attempt {}): {}", attempt + 1, e),
            }
        }

        ProviderResult::Pending
    }
}

#[async_trait]
impl ProviderAdapter for VirusTotalClient {
    fn name(&self) -> ProviderName {
        ProviderName::VirusTotal
    }

    async fn analyze(&self, target: &ScanTarget) -> ProviderResult {
        let Some(transport) = &self.transport else {
            return ProviderResult::Unavailable;
        };

        let url = target.url.as_str();
        let id = url_identifier(url);
        match transport.lookup(&id).await {
            Ok(report) => ProviderResult::Success(ProviderPayload::Reputation(report)),
            Err(e) if e.is_not_found() => self.submit_and_poll(transport, url, &id).await,
            Err(e) => ProviderResult::Failed(e.to_string()),
        }
    }
}

/// Content-derived identifier the provider uses for URL lookups:
/// unpadded URL-safe base64 of the URL string.
pub(crate) fn url_identifier(url: &str) -> String {
    URL_SAFE_NO_PAD.encode(url)
}

struct HttpTransport {
    http: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl ReputationTransport for HttpTransport {
    async fn lookup(&self, id: &str) -> Result<ReputationReport, FetchError> {
        fetch_json(
            self.http
                .get(format!("{BASE_URL}/urls/{id}"))
                .header("x-apikey", &self.api_key),
            LOOKUP_TIMEOUT,
        )
        .await
    }

    async fn submit(&self, url: &str) -> Result<Option<String>, FetchError> {
        let body: Value = fetch_json(
            self.http
                .post(format!("{BASE_URL}/urls"))
                .header("x-apikey", &self.api_key)
                .form(&[("url", url)]),
            SUBMIT_TIMEOUT,
        )
        .await?;
        Ok(body["data"]["id"].as_str().map(|s| s.to_string()))
    }

    async fn analysis(&self, id: &str) -> Result<Option<ReputationStats>, FetchError> {
        let body: Value = fetch_json(
            self.http
                .get(format!("{BASE_URL}/analyses/{id}"))
                .header("x-apikey", &self.api_key),
            LOOKUP_TIMEOUT,
        )
        .await?;
        let stats: Option<ReputationStats> =
            serde_json::from_value(body["data"]["attributes"]["stats"].clone()).ok();
        Ok(stats.filter(|s| s.malicious.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::url_normalizer::normalize;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        lookups: Mutex<VecDeque<Result<ReputationReport, FetchError>>>,
        submit: Mutex<Option<Result<Option<String>, FetchError>>>,
        analyses: Mutex<VecDeque<Result<Option<ReputationStats>, FetchError>>>,
    }

    #[async_trait]
    impl ReputationTransport for ScriptedTransport {
        async fn lookup(&self, _id: &str) -> Result<ReputationReport, FetchError> {
            self.lookups
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Status(404)))
        }
        async fn submit(&self, _url: &str) -> Result<Option<String>, FetchError> {
            self.submit
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(Some("job-1".into())))
        }
        async fn analysis(&self, _id: &str) -> Result<Option<ReputationStats>, FetchError> {
            self.analyses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }
    }

    fn client(transport: ScriptedTransport) -> VirusTotalClient {
        VirusTotalClient::with_transport(Arc::new(transport), 3, Duration::ZERO)
    }

    fn target() -> ScanTarget {
        ScanTarget::new(normalize("example.com").unwrap())
    }

    fn report_with_stats(malicious: i64) -> ReputationReport {
        serde_json::from_value(serde_json::json!({
            "data": { "attributes": { "last_analysis_stats": {
                "malicious": malicious, "suspicious": 0
            }}}
        }))
        .unwrap()
    }

    #[test]
    fn identifier_is_unpadded_url_safe() {
        let id = url_identifier("https://example.com/");
        assert!(!id.contains('='));
        assert!(!id.contains('+'));
        assert!(!id.contains('/'));
    }

    #[tokio::test]
    async fn missing_credential_is_unavailable() {
        let client = VirusTotalClient::new(None);
        assert!(matches!(
            client.analyze(&target()).await,
            ProviderResult::Unavailable
        ));
    }

    #[tokio::test]
    async fn direct_lookup_hit_skips_submission() {
        let transport = ScriptedTransport::default();
        transport
            .lookups
            .lock()
            .unwrap()
            .push_back(Ok(report_with_stats(4)));

        let outcome = client(transport).analyze(&target()).await;
        match outcome {
            ProviderResult::Success(ProviderPayload::Reputation(r)) => {
                assert_eq!(r.stats().and_then(|s| s.malicious), Some(4));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_submits_then_resolves_on_poll() {
        let transport = ScriptedTransport::default();
        // First lookup 404s, the second poll's analysis check resolves with
        // a zero-malicious verdict.
        transport
            .lookups
            .lock()
            .unwrap()
            .extend([Err(FetchError::Status(404)), Ok(ReputationReport::default())]);
        transport.analyses.lock().unwrap().extend([
            Ok(None),
            Ok(Some(ReputationStats {
                malicious: Some(0),
                suspicious: Some(0),
                extra: serde_json::Map::new(),
            })),
        ]);

        let outcome = client(transport).analyze(&target()).await;
        match outcome {
            ProviderResult::Success(ProviderPayload::Reputation(r)) => {
                assert_eq!(r.stats().and_then(|s| s.malicious), Some(0));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_polls_yield_pending() {
        let transport = ScriptedTransport::default();
        transport
            .lookups
            .lock()
            .unwrap()
            .push_back(Err(FetchError::Status(404)));
        // Every poll answers, but never with usable stats.
        let outcome = client(transport).analyze(&target()).await;
        assert!(matches!(outcome, ProviderResult::Pending));
    }

    #[tokio::test]
    async fn failed_submission_is_failed_not_pending() {
        let transport = ScriptedTransport::default();
        transport
            .lookups
            .lock()
            .unwrap()
            .push_back(Err(FetchError::Status(404)));
        *transport.submit.lock().unwrap() = Some(Err(FetchError::Status(500)));

        let outcome = client(transport).analyze(&target()).await;
        assert!(matches!(outcome, ProviderResult::Failed(_)));
    }

    #[tokio::test]
    async fn non_404_lookup_error_is_failed() {
        let transport = ScriptedTransport::default();
        transport
            .lookups
            .lock()
            .unwrap()
            .push_back(Err(FetchError::Status(503)));

        let outcome = client(transport).analyze(&target()).await;
        assert!(matches!(outcome, ProviderResult::Failed(_)));
    }
}
