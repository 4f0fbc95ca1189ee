// Malware-URL-list adapter (Google Safe Browsing v4 threatMatches lookup).
// A clean URL comes back as an empty object; any entry in `matches` is a
// blocklist hit.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::models::scan::{MalwareListReport, ProviderName, ProviderPayload, ProviderResult, ScanTarget};
use crate::services::providers::{build_http_client, fetch_json, ProviderAdapter};

const ENDPOINT: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";
const TIMEOUT: Duration = Duration::from_secs(12);

pub struct SafeBrowsingClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl SafeBrowsingClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: build_http_client(),
            api_key,
        }
    }
}

#[async_trait]
impl ProviderAdapter for SafeBrowsingClient {
    fn name(&self) -> ProviderName {
        ProviderName::SafeBrowsing
    }

    async fn analyze(&self, target: &ScanTarget) -> ProviderResult {
        let Some(api_key) = &self.api_key else {
            return ProviderResult::Unavailable;
        };

        let body = json!({
            "client": { "clientId": "zerobait", "clientVersion": "1.0.0" },
            "threatInfo": {
                "threatTypes": [
                    "MALWARE",
                    "SOCIAL_ENGINEERING",
                    "UNWANTED_SOFTWARE",
                    "POTENTIALLY_HARMFUL_APPLICATION"
                ],
                "platformTypes": ["ANY_PLATFORM"],
                "threatEntryTypes": ["URL"],
                "threatEntries": [{ "url": target.url.as_str() }]
            }
        });

        let request = self
            .http
            .post(ENDPOINT)
            .query(&[("key", api_key.as_str())])
            .json(&body);

        match fetch_json::<MalwareListReport>(request, TIMEOUT).await {
            Ok(report) => ProviderResult::Success(ProviderPayload::MalwareList(report)),
            Err(e) => ProviderResult::Failed(e.to_string()),
        }
    }
}
