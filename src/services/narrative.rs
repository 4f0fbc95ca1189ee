// ZB-36: Narrative generation over the raw provider results.
// The generative backend is told the severity tier up front and must align
// with it; its output is still untrusted free text and always goes through
// the consistency enforcer before use.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::scan::SeverityTier;
use crate::services::providers::{build_http_client, fetch_json};

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

const MISSING_KEY_PLACEHOLDER: &str = "AI analysis unavailable (missing GEMINI_API_KEY).";
const NO_SUMMARY_PLACEHOLDER: &str = "AI analysis did not return a summary.";
const FAILURE_PLACEHOLDER: &str = "AI analysis failed.";

const SYSTEM_TEXT: &str = "You are a cyber security expert explaining a website's safety to a non-technical friend. \
Analyze the provided technical JSON data and any screenshot. The JSON includes a severity_hint (low/medium/high) \
and optionally a risk_score_hint. Your wording MUST align with severity_hint and must not contradict it. \
Do NOT use markdown, headers, labels, bullet points, or structured prefixes. \
Do NOT start with 'Risk Level:', 'Why:', or 'Summary:'. Do NOT mention any numerical score. \
Start directly with the explanation. Keep it concise, direct, and human-readable (max 3 sentences).";

/// Everything the generator gets to look at: the per-provider results (minus
/// the screenshot payload) plus the precomputed severity hints.
#[derive(Debug, Clone)]
pub struct NarrativeContext {
    pub url: String,
    pub domain: Option<String>,
    pub technical: Value,
    pub severity_hint: SeverityTier,
    pub risk_score_hint: u8,
}

impl NarrativeContext {
    fn to_prompt_json(&self) -> Value {
        let mut body = json!({
            "url": self.url,
            "domain": self.domain,
            "severity_hint": self.severity_hint,
            "risk_score_hint": self.risk_score_hint,
        });
        if let (Some(target), Some(source)) = (body.as_object_mut(), self.technical.as_object()) {
            for (k, v) in source {
                target.insert(k.clone(), v.clone());
            }
        }
        body
    }
}

/// Seam for the generative backend so the pipeline is testable offline.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Produce the free-text summary. Never errors: total failure degrades
    /// to a fixed placeholder sentence.
    async fn generate(&self, context: &NarrativeContext, screenshot_base64: Option<&str>)
        -> String;

    /// Backend name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: Option<String>, model: Option<String>) -> Self {
        Self {
            http: build_http_client(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn request(&self, api_key: &str, body: &Value) -> Result<Value, String> {
        let request = self
            .http
            .post(format!("{ENDPOINT}/{}:generateContent", self.model))
            .query(&[("key", api_key)])
            .json(body);
        fetch_json(request, TIMEOUT).await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiGenerator {
    async fn generate(
        &self,
        context: &NarrativeContext,
        screenshot_base64: Option<&str>,
    ) -> String {
        let Some(api_key) = &self.api_key else {
            return MISSING_KEY_PLACEHOLDER.to_string();
        };

        let json_text = context.to_prompt_json().to_string();
        let mut parts = vec![json!({ "text": format!("Technical data:\n{json_text}") })];
        if let Some(data) = screenshot_base64 {
            parts.push(json!({ "inlineData": { "mimeType": "image/png", "data": data } }));
        }
        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "systemInstruction": { "role": "system", "parts": [{ "text": SYSTEM_TEXT }] },
        });

        match self.request(api_key, &body).await {
            Ok(response) => {
                if let Some(text) = extract_text(&response) {
                    return text;
                }
                NO_SUMMARY_PLACEHOLDER.to_string()
            }
            Err(e) => {
                debug!("narrative generation failed ({e}), retrying without attachment");
                // Simplified fallback: system instruction folded into the user
                // prompt, no screenshot.
                let fallback = json!({
                    "contents": [{ "role": "user", "parts": [{
                        "text": format!("{SYSTEM_TEXT}\n\nTechnical data:\n{json_text}")
                    }]}],
                });
                match self.request(api_key, &fallback).await {
                    Ok(response) => {
                        extract_text(&response).unwrap_or_else(|| FAILURE_PLACEHOLDER.to_string())
                    }
                    Err(e) => {
                        warn!("narrative generation fallback failed: {e}");
                        FAILURE_PLACEHOLDER.to_string()
                    }
                }
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

fn extract_text(response: &Value) -> Option<String> {
    let text = response["candidates"][0]["content"]["parts"][0]["text"].as_str()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
