// ZB-32: Core types for the deep-analysis pipeline.
// Provider payloads are partially typed: the fields the scorer and the
// narrative context read are modeled, everything else passes through opaquely
// into technical_details.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::utils::url_normalizer::NormalizedUrl;

// =============================================================================
// PROVIDER IDENTITY
// =============================================================================

/// The five intelligence providers the fan-out can consult. Serialized names
/// match the `technical_details` keys existing callers consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProviderName {
    #[serde(rename = "virusTotal")]
    VirusTotal,
    #[serde(rename = "googleSafeBrowsing")]
    SafeBrowsing,
    #[serde(rename = "whois")]
    Whois,
    #[serde(rename = "sslLabs")]
    SslLabs,
    #[serde(rename = "screenshot")]
    Screenshot,
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderName::VirusTotal => "virusTotal",
            ProviderName::SafeBrowsing => "googleSafeBrowsing",
            ProviderName::Whois => "whois",
            ProviderName::SslLabs => "sslLabs",
            ProviderName::Screenshot => "screenshot",
        };
        f.write_str(s)
    }
}

/// What a provider needs to look at. Domain-scoped providers are skipped
/// entirely when no domain could be derived from the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScope {
    Url,
    Domain,
}

/// Input handed to every adapter: the normalized URL plus its derived domain.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub url: NormalizedUrl,
    pub domain: Option<String>,
}

impl ScanTarget {
    pub fn new(url: NormalizedUrl) -> Self {
        let domain = url.domain();
        Self { url, domain }
    }
}

// =============================================================================
// PROVIDER RESULTS
// =============================================================================

/// Outcome of one provider call. Exactly one variant per provider per
/// analysis; only the submit-and-poll provider may produce `Pending`.
#[derive(Debug, Clone)]
pub enum ProviderResult {
    Success(ProviderPayload),
    /// Provider not configured for this deployment. Not an error, never
    /// retried, contributes zero to the score.
    Unavailable,
    /// Transport or parse failure. Contributes zero, surfaced in
    /// technical_details for observability.
    Failed(String),
    /// Submit-and-poll exhausted its budget without a verdict.
    Pending,
}

impl ProviderResult {
    pub fn payload(&self) -> Option<&ProviderPayload> {
        match self {
            ProviderResult::Success(p) => Some(p),
            _ => None,
        }
    }

    /// The technical_details wire shape existing callers expect:
    /// success payloads serialize as-is, the other variants as small
    /// marker objects.
    pub fn to_detail(&self) -> Value {
        match self {
            ProviderResult::Success(p) => serde_json::to_value(p).unwrap_or(Value::Null),
            ProviderResult::Unavailable => json!({ "unavailable": true }),
            ProviderResult::Failed(reason) => json!({ "error": reason }),
            ProviderResult::Pending => json!({ "pending": true }),
        }
    }
}

/// Per-provider structured data, one variant per adapter.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProviderPayload {
    Reputation(ReputationReport),
    MalwareList(MalwareListReport),
    Registration(RegistrationReport),
    Certificates(CertificateReport),
    Snapshot(SnapshotReport),
}

/// URL-reputation verdict statistics (engine counts).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationStats {
    pub malicious: Option<i64>,
    pub suspicious: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationAttributes {
    pub last_analysis_stats: Option<ReputationStats>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationData {
    pub attributes: Option<ReputationAttributes>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReputationReport {
    pub data: Option<ReputationData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReputationReport {
    /// Build the canonical report shape around a bare stats object, as the
    /// poll path does when only the analysis endpoint has answered.
    pub fn from_stats(stats: ReputationStats) -> Self {
        Self {
            data: Some(ReputationData {
                attributes: Some(ReputationAttributes {
                    last_analysis_stats: Some(stats),
                    extra: Map::new(),
                }),
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    pub fn stats(&self) -> Option<&ReputationStats> {
        self.data
            .as_ref()?
            .attributes
            .as_ref()?
            .last_analysis_stats
            .as_ref()
    }

    /// Readiness signal for submit-and-poll: a stats object with a numeric
    /// malicious count.
    pub fn has_stats(&self) -> bool {
        self.stats().map(|s| s.malicious.is_some()).unwrap_or(false)
    }
}

/// Malware-URL-list lookup. Clean URLs come back as an empty object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MalwareListReport {
    pub matches: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MalwareListReport {
    pub fn has_matches(&self) -> bool {
        self.matches.as_ref().map(|m| !m.is_empty()).unwrap_or(false)
    }
}

/// Domain registration metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationReport {
    #[serde(rename = "WhoisRecord")]
    pub whois_record: Option<WhoisRecord>,
    /// Top-level provider error string, checked for the "aborted" retry.
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhoisRecord {
    #[serde(rename = "createdDate")]
    pub created_date: Option<String>,
    #[serde(rename = "registryData")]
    pub registry_data: Option<RegistryData>,
    #[serde(rename = "dataError")]
    pub data_error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryData {
    #[serde(rename = "createdDate")]
    pub created_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistrationReport {
    /// Creation date of the registration, preferring the registrar record
    /// over registry data. A provider dataError never counts as a date.
    pub fn created_date(&self) -> Option<&str> {
        let record = self.whois_record.as_ref()?;
        record
            .created_date
            .as_deref()
            .or_else(|| record.registry_data.as_ref()?.created_date.as_deref())
    }
}

/// Certificate inspection: one grade per scanned endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateReport {
    pub endpoints: Option<Vec<CertificateEndpoint>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateEndpoint {
    pub grade: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CertificateReport {
    pub fn grades(&self) -> Vec<&str> {
        self.endpoints
            .iter()
            .flatten()
            .filter_map(|e| e.grade.as_deref())
            .collect()
    }
}

/// Rendered page snapshot, base64-encoded image bytes plus source metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotReport {
    pub base64: String,
    pub meta: Value,
}

// =============================================================================
// RAW RESULT BAG
// =============================================================================

/// Keyed bag of per-provider outcomes for one analysis. Contains an entry for
/// every provider that was applicable to the target; inapplicable providers
/// are absent, not marked unavailable.
#[derive(Debug, Clone, Default)]
pub struct RawResults {
    results: BTreeMap<ProviderName, ProviderResult>,
}

impl RawResults {
    pub fn insert(&mut self, name: ProviderName, result: ProviderResult) {
        self.results.insert(name, result);
    }

    pub fn get(&self, name: ProviderName) -> Option<&ProviderResult> {
        self.results.get(&name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProviderName, &ProviderResult)> {
        self.results.iter()
    }

    fn payload(&self, name: ProviderName) -> Option<&ProviderPayload> {
        self.get(name)?.payload()
    }

    pub fn reputation(&self) -> Option<&ReputationReport> {
        match self.payload(ProviderName::VirusTotal)? {
            ProviderPayload::Reputation(r) => Some(r),
            _ => None,
        }
    }

    pub fn malware_list(&self) -> Option<&MalwareListReport> {
        match self.payload(ProviderName::SafeBrowsing)? {
            ProviderPayload::MalwareList(m) => Some(m),
            _ => None,
        }
    }

    pub fn registration(&self) -> Option<&RegistrationReport> {
        match self.payload(ProviderName::Whois)? {
            ProviderPayload::Registration(r) => Some(r),
            _ => None,
        }
    }

    pub fn certificates(&self) -> Option<&CertificateReport> {
        match self.payload(ProviderName::SslLabs)? {
            ProviderPayload::Certificates(c) => Some(c),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<&SnapshotReport> {
        match self.payload(ProviderName::Screenshot)? {
            ProviderPayload::Snapshot(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_details(&self) -> BTreeMap<ProviderName, Value> {
        self.results
            .iter()
            .map(|(name, result)| (*name, result.to_detail()))
            .collect()
    }
}

// =============================================================================
// SCORE, TIER, RESULT, CACHE ENTRY
// =============================================================================

/// Three-valued severity bucket, always derived from the numeric score and
/// never persisted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Low,
    Medium,
    High,
}

impl SeverityTier {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            SeverityTier::High
        } else if score >= 40 {
            SeverityTier::Medium
        } else {
            SeverityTier::Low
        }
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SeverityTier::Low => "low",
            SeverityTier::Medium => "medium",
            SeverityTier::High => "high",
        };
        f.write_str(s)
    }
}

/// The aggregate a deep analysis produces, caches and returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ai_summary: String,
    pub risk_score: u8,
    pub technical_details: BTreeMap<ProviderName, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_cache: Option<bool>,
}

impl AnalysisResult {
    pub fn severity(&self) -> SeverityTier {
        SeverityTier::from_score(self.risk_score)
    }
}

/// Cached analysis keyed by normalized URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: NormalizedUrl,
    pub result: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh while younger than `ttl_days`. A negative age (clock skew) is
    /// treated as stale and triggers re-analysis.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl_days: i64) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age >= Duration::zero() && age < Duration::days(ttl_days)
    }
}
