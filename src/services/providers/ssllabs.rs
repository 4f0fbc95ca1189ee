// Certificate-grade adapter (SSL Labs). Cached assessments only; the
// endpoint takes no credential.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::scan::{
    CertificateReport, ProviderName, ProviderPayload, ProviderResult, ScanTarget, TargetScope,
};
use crate::services::providers::{build_http_client, fetch_json, ProviderAdapter};

const ENDPOINT: &str = "https://api.ssllabs.com/api/v3/analyze";
const TIMEOUT: Duration = Duration::from_secs(15);

pub struct SslLabsClient {
    http: reqwest::Client,
}

impl SslLabsClient {
    pub fn new() -> Self {
        Self {
            http: build_http_client(),
        }
    }
}

impl Default for SslLabsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for SslLabsClient {
    fn name(&self) -> ProviderName {
        ProviderName::SslLabs
    }

    fn scope(&self) -> TargetScope {
        TargetScope::Domain
    }

    async fn analyze(&self, target: &ScanTarget) -> ProviderResult {
        let Some(domain) = &target.domain else {
            return ProviderResult::Unavailable;
        };

        let request = self.http.get(ENDPOINT).query(&[
            ("host", domain.as_str()),
            ("fromCache", "on"),
            ("all", "done"),
        ]);

        match fetch_json::<CertificateReport>(request, TIMEOUT).await {
            Ok(report) => ProviderResult::Success(ProviderPayload::Certificates(report)),
            Err(e) => ProviderResult::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_collect_across_endpoints() {
        let report: CertificateReport = serde_json::from_value(serde_json::json!({
            "host": "example.com",
            "endpoints": [
                { "grade": "A", "ipAddress": "203.0.113.1" },
                { "ipAddress": "203.0.113.2" },
                { "grade": "B" }
            ]
        }))
        .unwrap();
        assert_eq!(report.grades(), vec!["A", "B"]);
    }
}
