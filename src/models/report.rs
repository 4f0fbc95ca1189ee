// Community reporting and quick-scan types, plus the scan API request and
// response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::scan::AnalysisResult;

/// Quick-scanner verdict, in precedence order from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanVerdict {
    Warning,
    CommunityReported,
    Unknown,
    Safe,
}

/// One community report against a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReportRecord {
    pub fn new(reason: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reason,
            created_at: Utc::now(),
        }
    }
}

/// A threat-intel hit remembered for a URL so repeat quick scans skip the
/// provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelHit {
    pub provider: String,
    pub verdict: String,
}

// =============================================================================
// REQUEST / RESPONSE BODIES
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub url: String,
    pub normalized_url: String,
    pub verdict: ScanVerdict,
    pub reasons: Vec<String>,
    pub report_count: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,
    #[validate(length(max = 1024, message = "Reason must be at most 1024 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    pub normalized_url: String,
    pub report_count: u64,
}

/// Deep-analysis response body; the cached/returned aggregate as-is.
pub type AnalyzeResponse = AnalysisResult;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdicts_serialize_screaming() {
        assert_eq!(
            serde_json::to_value(ScanVerdict::CommunityReported).unwrap(),
            serde_json::json!("COMMUNITY_REPORTED")
        );
        assert_eq!(
            serde_json::to_value(ScanVerdict::Safe).unwrap(),
            serde_json::json!("SAFE")
        );
    }
}
