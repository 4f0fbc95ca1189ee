// Visual-snapshot adapter (urlscan.io). Submit, poll for the rendered
// screenshot reference, then fetch the image bytes. A missing screenshot must
// never fail the overall analysis, so every failure path collapses to
// Unavailable rather than Failed.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::debug;

use crate::models::scan::{ProviderName, ProviderPayload, ProviderResult, ScanTarget, SnapshotReport};
use crate::services::providers::{build_http_client, fetch_json, ProviderAdapter};

const SUBMIT_ENDPOINT: &str = "https://urlscan.io/api/v1/scan";
const RESULT_ENDPOINT: &str = "https://urlscan.io/api/v1/result";
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(12);
const RESULT_TIMEOUT: Duration = Duration::from_secs(12);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(12);
const POLL_ATTEMPTS: u32 = 3;
const POLL_DELAY: Duration = Duration::from_secs(3);

pub struct UrlscanClient {
    http: reqwest::Client,
    api_key: Option<String>,
    poll_delay: Duration,
}

impl UrlscanClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: build_http_client(),
            api_key,
            poll_delay: POLL_DELAY,
        }
    }

    async fn submit(&self, api_key: &str, url: &str) -> Option<String> {
        let body: Value = fetch_json(
            self.http
                .post(SUBMIT_ENDPOINT)
                .header("API-Key", api_key)
                .json(&json!({ "url": url, "visibility": "private" })),
            SUBMIT_TIMEOUT,
        )
        .await
        .ok()?;
        body["uuid"].as_str().map(|s| s.to_string())
    }

    async fn poll_for_screenshot(&self, uuid: &str) -> Option<String> {
        for _ in 0..POLL_ATTEMPTS {
            sleep(self.poll_delay).await;
            let result: Value =
                match fetch_json(self.http.get(format!("{RESULT_ENDPOINT}/{uuid}/")), RESULT_TIMEOUT)
                    .await
                {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("snapshot result not ready: {e}");
                        continue;
                    }
                };
            if let Some(url) = screenshot_url(&result) {
                return Some(url.to_string());
            }
        }
        None
    }

    async fn fetch_image(&self, url: &str) -> Option<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .timeout(IMAGE_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.bytes().await.ok().map(|b| b.to_vec())
    }
}

/// The screenshot reference has moved around between result revisions; take
/// whichever field is populated.
fn screenshot_url(result: &Value) -> Option<&str> {
    result["screenshot"]
        .as_str()
        .or_else(|| result["task"]["screenshotURL"].as_str())
        .or_else(|| result["screenshotURL"].as_str())
}

#[async_trait]
impl ProviderAdapter for UrlscanClient {
    fn name(&self) -> ProviderName {
        ProviderName::Screenshot
    }

    async fn analyze(&self, target: &ScanTarget) -> ProviderResult {
        let Some(api_key) = &self.api_key else {
            return ProviderResult::Unavailable;
        };

        let Some(uuid) = self.submit(api_key, target.url.as_str()).await else {
            return ProviderResult::Unavailable;
        };
        let Some(image_url) = self.poll_for_screenshot(&uuid).await else {
            return ProviderResult::Unavailable;
        };
        let Some(bytes) = self.fetch_image(&image_url).await else {
            return ProviderResult::Unavailable;
        };

        ProviderResult::Success(ProviderPayload::Snapshot(SnapshotReport {
            base64: STANDARD.encode(bytes),
            meta: json!({ "source": "urlscan", "url": image_url }),
        }))
    }
}
