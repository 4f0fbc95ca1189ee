// ZB-39: Community/heuristic quick scanner. No slow provider fan-out: lexical
// heuristics, community-report counts and a remembered malware-list verdict,
// answered in one round trip. The malware-list provider is consulted at most
// once per URL; a hit is recorded so repeat scans skip the network call.

use std::sync::Arc;

use tracing::{debug, info};

use crate::models::report::{IntelHit, ScanVerdict};
use crate::models::scan::{ProviderPayload, ProviderResult, ScanTarget};
use crate::services::providers::ProviderAdapter;
use crate::services::store::{IntelStore, ReportStore, StoreError};
use crate::utils::heuristics;
use crate::utils::url_normalizer::NormalizedUrl;

pub const PROVIDER_SAFE_BROWSING: &str = "google_safe_browsing";
pub const PROVIDER_PHISHTANK: &str = "phishtank";

/// Reports needed before the community alone escalates to a warning.
const WARNING_REPORT_THRESHOLD: u64 = 3;

#[derive(Debug, Clone)]
pub struct QuickScanOutcome {
    pub verdict: ScanVerdict,
    pub reasons: Vec<String>,
    pub report_count: u64,
}

pub struct QuickScanService {
    intel: Arc<dyn IntelStore>,
    reports: Arc<dyn ReportStore>,
    malware_list: Arc<dyn ProviderAdapter>,
}

impl QuickScanService {
    pub fn new(
        intel: Arc<dyn IntelStore>,
        reports: Arc<dyn ReportStore>,
        malware_list: Arc<dyn ProviderAdapter>,
    ) -> Self {
        Self {
            intel,
            reports,
            malware_list,
        }
    }

    pub async fn scan(
        &self,
        raw_url: &str,
        normalized: &NormalizedUrl,
    ) -> Result<QuickScanOutcome, StoreError> {
        self.ensure_malware_intel(normalized).await;

        let report_count = self.reports.count(normalized).await?;
        let heuristic = heuristics::evaluate(raw_url);
        let hits = self.intel.hits(normalized).await.unwrap_or_default();

        let mut reasons = heuristic.reasons.clone();
        let has_phishtank_hit = hits.iter().any(|h| h.provider == PROVIDER_PHISHTANK);
        if has_phishtank_hit {
            reasons.push("Flagged as phishing in PhishTank database".to_string());
        }
        let has_safe_browsing_hit = hits.iter().any(|h| h.provider == PROVIDER_SAFE_BROWSING);
        if has_safe_browsing_hit {
            reasons.push("Flagged as unsafe by Google Safe Browsing".to_string());
        }

        let verdict = if has_phishtank_hit || has_safe_browsing_hit {
            ScanVerdict::Warning
        } else if report_count >= WARNING_REPORT_THRESHOLD {
            ScanVerdict::Warning
        } else if report_count > 0 {
            ScanVerdict::CommunityReported
        } else if heuristic.is_suspicious() {
            ScanVerdict::Unknown
        } else {
            ScanVerdict::Safe
        };

        Ok(QuickScanOutcome {
            verdict,
            reasons,
            report_count,
        })
    }

    /// Make sure we have a malware-list opinion recorded for this URL. Any
    /// provider trouble is skipped silently; missing intel never blocks a
    /// scan.
    async fn ensure_malware_intel(&self, key: &NormalizedUrl) {
        match self.intel.hits(key).await {
            Ok(hits) if hits.iter().any(|h| h.provider == PROVIDER_SAFE_BROWSING) => return,
            Ok(_) => {}
            Err(e) => {
                debug!("intel lookup failed for {key}: {e}");
                return;
            }
        }

        let target = ScanTarget::new(key.clone());
        match self.malware_list.analyze(&target).await {
            ProviderResult::Success(ProviderPayload::MalwareList(report))
                if report.has_matches() =>
            {
                info!("malware-list hit recorded for {key}");
                let hit = IntelHit {
                    provider: PROVIDER_SAFE_BROWSING.to_string(),
                    verdict: "phishing".to_string(),
                };
                if let Err(e) = self.intel.record(key, &hit).await {
                    debug!("failed to record intel hit for {key}: {e}");
                }
            }
            ProviderResult::Failed(reason) => {
                debug!("malware-list check failed for {key}: {reason}");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::{MalwareListReport, ProviderName};
    use crate::services::store::{MemoryIntelStore, MemoryReportStore};
    use crate::models::report::ReportRecord;
    use crate::utils::url_normalizer::normalize;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMalwareAdapter {
        calls: AtomicUsize,
        hit: bool,
    }

    #[async_trait]
    impl ProviderAdapter for CountingMalwareAdapter {
        fn name(&self) -> ProviderName {
            ProviderName::SafeBrowsing
        }
        async fn analyze(&self, _target: &ScanTarget) -> ProviderResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hit {
                let report: MalwareListReport =
                    serde_json::from_value(serde_json::json!({ "matches": [{}] })).unwrap();
                ProviderResult::Success(ProviderPayload::MalwareList(report))
            } else {
                ProviderResult::Success(ProviderPayload::MalwareList(MalwareListReport::default()))
            }
        }
    }

    fn service(hit: bool) -> (QuickScanService, Arc<CountingMalwareAdapter>) {
        let adapter = Arc::new(CountingMalwareAdapter {
            calls: AtomicUsize::new(0),
            hit,
        });
        let service = QuickScanService::new(
            Arc::new(MemoryIntelStore::default()),
            Arc::new(MemoryReportStore::default()),
            adapter.clone(),
        );
        (service, adapter)
    }

    #[tokio::test]
    async fn clean_url_is_safe() {
        let (service, _) = service(false);
        let key = normalize("https://example.com/docs").unwrap();
        let outcome = service.scan("https://example.com/docs", &key).await.unwrap();
        assert_eq!(outcome.verdict, ScanVerdict::Safe);
        assert!(outcome.reasons.is_empty());
        assert_eq!(outcome.report_count, 0);
    }

    #[tokio::test]
    async fn heuristic_hit_is_unknown() {
        let (service, _) = service(false);
        let key = normalize("https://example.com/login").unwrap();
        let outcome = service.scan("https://example.com/login", &key).await.unwrap();
        assert_eq!(outcome.verdict, ScanVerdict::Unknown);
        assert!(!outcome.reasons.is_empty());
    }

    #[tokio::test]
    async fn malware_list_hit_is_warning_and_remembered() {
        let (service, adapter) = service(true);
        let key = normalize("https://evil.test/").unwrap();

        let outcome = service.scan("https://evil.test/", &key).await.unwrap();
        assert_eq!(outcome.verdict, ScanVerdict::Warning);
        assert!(outcome
            .reasons
            .iter()
            .any(|r| r.contains("Google Safe Browsing")));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);

        // Second scan reuses the recorded hit.
        let outcome = service.scan("https://evil.test/", &key).await.unwrap();
        assert_eq!(outcome.verdict, ScanVerdict::Warning);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn report_counts_escalate() {
        let reports = Arc::new(MemoryReportStore::default());
        let adapter = Arc::new(CountingMalwareAdapter {
            calls: AtomicUsize::new(0),
            hit: false,
        });
        let service = QuickScanService::new(
            Arc::new(MemoryIntelStore::default()),
            reports.clone(),
            adapter,
        );
        let key = normalize("https://example.com/").unwrap();

        reports.add(&key, ReportRecord::new(None)).await.unwrap();
        let outcome = service.scan("https://example.com/", &key).await.unwrap();
        assert_eq!(outcome.verdict, ScanVerdict::CommunityReported);
        assert_eq!(outcome.report_count, 1);

        reports.add(&key, ReportRecord::new(None)).await.unwrap();
        reports.add(&key, ReportRecord::new(None)).await.unwrap();
        let outcome = service.scan("https://example.com/", &key).await.unwrap();
        assert_eq!(outcome.verdict, ScanVerdict::Warning);
        assert_eq!(outcome.report_count, 3);
    }

    #[tokio::test]
    async fn intel_hit_outranks_reports_and_heuristics() {
        let (service, _) = service(true);
        let key = normalize("https://evil.test/login").unwrap();
        let outcome = service.scan("https://evil.test/login", &key).await.unwrap();
        assert_eq!(outcome.verdict, ScanVerdict::Warning);
        // Heuristic and intel reasons are both surfaced.
        assert!(outcome.reasons.len() >= 2);
    }
}
