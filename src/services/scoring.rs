// ZB-33: Deterministic risk scoring over the raw provider result bag.
// Additive weights with a ceiling clamp at 100; absent, failed, pending and
// unavailable providers all contribute zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::models::scan::{RawResults, RegistrationReport};

/// Maximum risk score.
pub const MAX_SCORE: u8 = 100;

/// Map a raw result bag to a bounded risk score. Pure: identical bags and
/// `now` always yield identical scores.
pub fn risk_score(results: &RawResults, now: DateTime<Utc>) -> u8 {
    let mut score: u32 = 0;

    // Any malware-list match is the strongest single signal.
    if results
        .malware_list()
        .map(|m| m.has_matches())
        .unwrap_or(false)
    {
        score += 70;
    }

    // Reputation counts: malicious beats suspicious, only one branch fires.
    if let Some(stats) = results.reputation().and_then(|r| r.stats()) {
        if let Some(malicious) = stats.malicious {
            if malicious > 0 {
                score += 60;
            } else if stats.suspicious.map(|s| s > 0).unwrap_or(false) {
                score += 30;
            }
        }
    }

    // Young registrations: the newer the domain, the bigger the bump.
    if let Some(age_days) = results
        .registration()
        .and_then(|r| registration_age_days(r, now))
    {
        if age_days <= 3 {
            score += 25;
        } else if age_days <= 7 {
            score += 20;
        } else if age_days <= 30 {
            score += 10;
        }
    }

    // Certificate grades: lexicographic worst across endpoints. Single-letter
    // grades sort usefully; this is a simplification, not cryptography.
    if let Some(report) = results.certificates() {
        let mut grades = report.grades();
        if !grades.is_empty() {
            grades.sort_unstable();
            let worst = grades[0];
            if worst <= "B" {
                score += 10;
            }
            if worst == "F" || worst == "T" {
                score += 20;
            }
        }
    }

    score.min(MAX_SCORE as u32) as u8
}

/// Age of the registration in days, clamped at zero. `None` when the report
/// carries no parseable creation date; a provider dataError is never treated
/// as a date source.
pub fn registration_age_days(report: &RegistrationReport, now: DateTime<Utc>) -> Option<i64> {
    let created = parse_created_date(report.created_date()?)?;
    Some(now.signed_duration_since(created).num_days().max(0))
}

/// Registries answer in several date dialects; try the common ones.
fn parse_created_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::{
        CertificateReport, MalwareListReport, ProviderName, ProviderPayload, ProviderResult,
        ReputationReport,
    };
    use chrono::Duration;
    use serde_json::json;

    fn bag(entries: Vec<(ProviderName, ProviderResult)>) -> RawResults {
        let mut results = RawResults::default();
        for (name, result) in entries {
            results.insert(name, result);
        }
        results
    }

    fn reputation(malicious: i64, suspicious: i64) -> ProviderResult {
        let report: ReputationReport = serde_json::from_value(json!({
            "data": { "attributes": { "last_analysis_stats": {
                "malicious": malicious, "suspicious": suspicious
            }}}
        }))
        .unwrap();
        ProviderResult::Success(ProviderPayload::Reputation(report))
    }

    fn malware_hit() -> ProviderResult {
        let report: MalwareListReport =
            serde_json::from_value(json!({ "matches": [{ "threatType": "MALWARE" }] })).unwrap();
        ProviderResult::Success(ProviderPayload::MalwareList(report))
    }

    fn registration(created: &str) -> ProviderResult {
        let report: RegistrationReport = serde_json::from_value(json!({
            "WhoisRecord": { "createdDate": created }
        }))
        .unwrap();
        ProviderResult::Success(ProviderPayload::Registration(report))
    }

    fn certificates(grades: &[&str]) -> ProviderResult {
        let endpoints: Vec<_> = grades.iter().map(|g| json!({ "grade": g })).collect();
        let report: CertificateReport =
            serde_json::from_value(json!({ "endpoints": endpoints })).unwrap();
        ProviderResult::Success(ProviderPayload::Certificates(report))
    }

    #[test]
    fn empty_bag_scores_zero() {
        assert_eq!(risk_score(&RawResults::default(), Utc::now()), 0);
    }

    #[test]
    fn unavailable_and_failed_contribute_zero() {
        let results = bag(vec![
            (ProviderName::SafeBrowsing, ProviderResult::Unavailable),
            (ProviderName::VirusTotal, ProviderResult::Pending),
            (
                ProviderName::Whois,
                ProviderResult::Failed("timeout".into()),
            ),
        ]);
        assert_eq!(risk_score(&results, Utc::now()), 0);
    }

    #[test]
    fn malware_list_hit_scores_seventy() {
        let results = bag(vec![(ProviderName::SafeBrowsing, malware_hit())]);
        assert_eq!(risk_score(&results, Utc::now()), 70);
    }

    #[test]
    fn reputation_malicious_beats_suspicious() {
        let results = bag(vec![(ProviderName::VirusTotal, reputation(2, 5))]);
        assert_eq!(risk_score(&results, Utc::now()), 60);

        let results = bag(vec![(ProviderName::VirusTotal, reputation(0, 5))]);
        assert_eq!(risk_score(&results, Utc::now()), 30);

        let results = bag(vec![(ProviderName::VirusTotal, reputation(0, 0))]);
        assert_eq!(risk_score(&results, Utc::now()), 0);
    }

    #[test]
    fn registration_age_brackets() {
        let now = Utc::now();
        let day = |n: i64| (now - Duration::days(n)).to_rfc3339();

        for (age, expected) in [(2, 25), (7, 20), (30, 10), (31, 0), (365, 0)] {
            let results = bag(vec![(ProviderName::Whois, registration(&day(age)))]);
            assert_eq!(risk_score(&results, now), expected, "age {age}");
        }
    }

    #[test]
    fn registration_data_error_is_age_unknown() {
        let report: RegistrationReport = serde_json::from_value(json!({
            "WhoisRecord": { "dataError": "2024-01-01" }
        }))
        .unwrap();
        let results = bag(vec![(
            ProviderName::Whois,
            ProviderResult::Success(ProviderPayload::Registration(report)),
        )]);
        assert_eq!(risk_score(&results, Utc::now()), 0);
    }

    #[test]
    fn date_dialects_parse() {
        for raw in [
            "2024-06-01T12:00:00Z",
            "2024-06-01T12:00:00+0200",
            "2024-06-01 12:00:00",
            "2024-06-01",
        ] {
            assert!(parse_created_date(raw).is_some(), "failed for {raw}");
        }
        assert!(parse_created_date("data aborted").is_none());
    }

    #[test]
    fn certificate_grade_weights() {
        let now = Utc::now();
        for (grades, expected) in [
            (vec!["A+", "A"], 10u8),
            (vec!["B"], 10),
            (vec!["F"], 20),
            (vec!["T"], 20),
            (vec!["A", "F"], 10),
            (vec![], 0),
        ] {
            let results = bag(vec![(ProviderName::SslLabs, certificates(&grades))]);
            assert_eq!(risk_score(&results, now), expected, "grades {grades:?}");
        }
    }

    #[test]
    fn score_is_clamped_to_ceiling() {
        let now = Utc::now();
        let results = bag(vec![
            (ProviderName::SafeBrowsing, malware_hit()),
            (ProviderName::VirusTotal, reputation(9, 0)),
            (
                ProviderName::Whois,
                registration(&(now - Duration::days(1)).to_rfc3339()),
            ),
            (ProviderName::SslLabs, certificates(&["F"])),
        ]);
        assert_eq!(risk_score(&results, now), 100);
    }

    #[test]
    fn score_is_deterministic() {
        let now = Utc::now();
        let make = || {
            bag(vec![
                (ProviderName::VirusTotal, reputation(0, 3)),
                (ProviderName::SslLabs, certificates(&["B", "A"])),
            ])
        };
        assert_eq!(risk_score(&make(), now), risk_score(&make(), now));
    }
}
