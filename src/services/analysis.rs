// ZB-40: Deep-analysis orchestrator. Strict pipeline per URL:
// normalize -> cache check (with self-healing) -> provider fan-out -> score
// -> narrative -> consistency enforcement -> cache write. Malformed input is
// the only fatal path; everything downstream degrades instead of failing.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::scan::{
    AnalysisResult, CacheEntry, ProviderName, RawResults, ScanTarget, SeverityTier,
};
use crate::services::consistency::{apply_floor, narrative_floor, reconcile};
use crate::services::narrative::{NarrativeContext, NarrativeGenerator};
use crate::services::providers::{fan_out, ProviderAdapter};
use crate::services::scoring::risk_score;
use crate::services::store::ResultStore;
use crate::utils::url_normalizer::{normalize, NormalizeError};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Malformed(#[from] NormalizeError),

    #[error("Internal scan error: {0}")]
    Internal(String),
}

pub struct ScanService {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    narrative: Arc<dyn NarrativeGenerator>,
    store: Arc<dyn ResultStore>,
    cache_ttl_days: i64,
}

impl ScanService {
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        narrative: Arc<dyn NarrativeGenerator>,
        store: Arc<dyn ResultStore>,
        cache_ttl_days: i64,
    ) -> Self {
        Self {
            adapters,
            narrative,
            store,
            cache_ttl_days,
        }
    }

    /// Analyze a user-submitted URL. Returns the cached aggregate when a
    /// fresh entry exists (re-enforced and touched if it needed healing),
    /// otherwise runs the full pipeline.
    pub async fn analyze(&self, raw_url: &str) -> Result<AnalysisResult, ScanError> {
        let normalized = normalize(raw_url)?;
        let target = ScanTarget::new(normalized.clone());
        let now = Utc::now();

        // Cache read failures degrade to a miss; caching is an optimization.
        match self.store.get(&normalized).await {
            Ok(Some(entry)) if entry.is_fresh(now, self.cache_ttl_days) => {
                return Ok(self.serve_cached(entry).await);
            }
            Ok(_) => {}
            Err(e) => warn!("cache read failed for {normalized}: {e}"),
        }

        info!("analyzing {normalized}");
        let results = fan_out(&self.adapters, &target).await;
        let computed = risk_score(&results, now);
        let severity = SeverityTier::from_score(computed);

        let context = NarrativeContext {
            url: normalized.to_string(),
            domain: target.domain.clone(),
            technical: narrative_technical(&results),
            severity_hint: severity,
            risk_score_hint: computed,
        };
        let screenshot = results.snapshot().map(|s| s.base64.clone());
        let raw_narrative = self
            .narrative
            .generate(&context, screenshot.as_deref())
            .await;

        // Enforcement order matters: the floor comes from the raw narrative,
        // the final tier from the floored score, and the tone correction uses
        // that final tier. The persisted pair can then never contradict
        // itself.
        let floor = narrative_floor(&raw_narrative);
        let final_score = apply_floor(computed, floor);
        let final_tier = SeverityTier::from_score(final_score);
        let ai_summary = reconcile(&raw_narrative, final_tier);

        let result = AnalysisResult {
            ai_summary,
            risk_score: final_score,
            technical_details: results.to_details(),
            from_cache: None,
        };

        let entry = CacheEntry {
            key: normalized.clone(),
            result: result.clone(),
            created_at: now,
        };
        if let Err(e) = self.store.put(&entry).await {
            warn!("cache write failed for {normalized}: {e}");
        }

        Ok(result)
    }

    /// Serve a fresh cache hit, re-running enforcement in case the rules
    /// changed since the entry was written. A mutated entry is rewritten with
    /// a reset age rather than served stale-but-inconsistent.
    async fn serve_cached(&self, entry: CacheEntry) -> AnalysisResult {
        match heal(&entry.result) {
            Some(updated) => {
                info!("healing cached result for {}", entry.key);
                let refreshed = CacheEntry {
                    key: entry.key.clone(),
                    result: updated.clone(),
                    created_at: Utc::now(),
                };
                if let Err(e) = self.store.touch(&refreshed).await {
                    warn!("cache heal write failed for {}: {e}", entry.key);
                }
                AnalysisResult {
                    from_cache: Some(true),
                    ..updated
                }
            }
            None => AnalysisResult {
                from_cache: Some(true),
                ..entry.result
            },
        }
    }
}

/// Re-apply the consistency passes to a stored result. `Some` with the
/// corrected aggregate when anything had to change, `None` when the stored
/// pair already satisfies the invariant.
fn heal(result: &AnalysisResult) -> Option<AnalysisResult> {
    let floor = narrative_floor(&result.ai_summary);
    let score = apply_floor(result.risk_score, floor);
    let tier = SeverityTier::from_score(score);
    let summary = reconcile(&result.ai_summary, tier);

    if score == result.risk_score && summary == result.ai_summary {
        return None;
    }
    Some(AnalysisResult {
        ai_summary: summary,
        risk_score: score,
        technical_details: result.technical_details.clone(),
        from_cache: None,
    })
}

/// Provider sections handed to the narrative backend: everything except the
/// screenshot payload, which travels as an attachment instead.
fn narrative_technical(results: &RawResults) -> Value {
    let mut map = serde_json::Map::new();
    for (name, detail) in results.to_details() {
        if name == ProviderName::Screenshot {
            continue;
        }
        map.insert(name.to_string(), detail);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result(summary: &str, score: u8) -> AnalysisResult {
        AnalysisResult {
            ai_summary: summary.to_string(),
            risk_score: score,
            technical_details: BTreeMap::new(),
            from_cache: None,
        }
    }

    #[test]
    fn heal_leaves_consistent_results_alone() {
        assert!(heal(&result("Nothing remarkable about this site.", 10)).is_none());
        assert!(heal(&result(
            "Multiple engines flag this page; avoid it.",
            85
        ))
        .is_none());
    }

    #[test]
    fn heal_raises_score_to_narrative_floor() {
        let healed = heal(&result("This page distributes malware.", 20)).unwrap();
        assert_eq!(healed.risk_score, 70);
        // At the floored tier the alarming wording is consistent again.
        assert_eq!(healed.ai_summary, "This page distributes malware.");
    }

    #[test]
    fn heal_corrects_contradictory_tone() {
        let healed = heal(&result("This site seems safe to browse.", 90)).unwrap();
        assert_eq!(healed.risk_score, 90);
        assert_ne!(healed.ai_summary, "This site seems safe to browse.");
    }

    #[test]
    fn heal_is_idempotent() {
        let healed = heal(&result("Probably phishing, but seems safe?", 10)).unwrap();
        assert!(heal(&healed).is_none(), "healed result must be stable");
    }
}
