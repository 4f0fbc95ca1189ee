// Domain-registration adapter (WhoisXML). Looks up by domain, not full URL.
// The provider occasionally reports an internal "data aborted" condition in
// an otherwise-2xx body; that gets exactly one retry after a short delay.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

use crate::models::scan::{
    ProviderName, ProviderPayload, ProviderResult, RegistrationReport, ScanTarget, TargetScope,
};
use crate::services::providers::{build_http_client, fetch_json, FetchError, ProviderAdapter};

const ENDPOINT: &str = "https://www.whoisxmlapi.com/whoisserver/WhoisService";
const TIMEOUT: Duration = Duration::from_secs(20);
const RETRY_TIMEOUT: Duration = Duration::from_secs(22);
const RETRY_DELAY: Duration = Duration::from_millis(1200);

pub struct WhoisXmlClient {
    http: reqwest::Client,
    api_key: Option<String>,
    retry_delay: Duration,
}

impl WhoisXmlClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: build_http_client(),
            api_key,
            retry_delay: RETRY_DELAY,
        }
    }

    async fn lookup(
        &self,
        api_key: &str,
        domain: &str,
        timeout: Duration,
    ) -> Result<RegistrationReport, FetchError> {
        let request = self.http.get(ENDPOINT).query(&[
            ("apiKey", api_key),
            ("domainName", domain),
            ("outputFormat", "JSON"),
        ]);
        fetch_json(request, timeout).await
    }
}

/// The provider's in-band abort marker, surfaced either as a top-level error
/// string or inside the whois record itself.
fn is_aborted(report: &RegistrationReport) -> bool {
    let top = report
        .error
        .as_deref()
        .map(|e| e.to_lowercase().contains("aborted"))
        .unwrap_or(false);
    let inner = report
        .whois_record
        .as_ref()
        .and_then(|r| r.data_error.as_deref())
        .map(|e| e.to_lowercase().contains("aborted"))
        .unwrap_or(false);
    top || inner
}

#[async_trait]
impl ProviderAdapter for WhoisXmlClient {
    fn name(&self) -> ProviderName {
        ProviderName::Whois
    }

    fn scope(&self) -> TargetScope {
        TargetScope::Domain
    }

    async fn analyze(&self, target: &ScanTarget) -> ProviderResult {
        let Some(api_key) = &self.api_key else {
            return ProviderResult::Unavailable;
        };
        let Some(domain) = &target.domain else {
            return ProviderResult::Unavailable;
        };

        match self.lookup(api_key, domain, TIMEOUT).await {
            Ok(report) if is_aborted(&report) => {
                debug!("whois lookup for {domain} aborted upstream, retrying once");
                sleep(self.retry_delay).await;
                match self.lookup(api_key, domain, RETRY_TIMEOUT).await {
                    Ok(report) => ProviderResult::Success(ProviderPayload::Registration(report)),
                    Err(e) => ProviderResult::Failed(e.to_string()),
                }
            }
            Ok(report) => ProviderResult::Success(ProviderPayload::Registration(report)),
            Err(e) => ProviderResult::Failed(e.to_string()),
        }
    }
}
