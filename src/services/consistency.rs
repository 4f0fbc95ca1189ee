// ZB-34: Score/narrative consistency enforcement.
// Pass A derives a minimum risk floor from the narrative's wording; Pass B
// rewrites the narrative when its tone contradicts the final severity tier.
// Together they guarantee the persisted {score, narrative} pair never
// contradicts itself.

use crate::models::scan::SeverityTier;

/// Replacement used when a high-severity result came with reassuring prose.
pub const HIGH_SEVERITY_DISCLAIMER: &str =
    "This site shows high-risk indicators from security checks. Avoid interacting or entering any credentials.";

/// Replacement used when a low-severity result came with alarming prose.
pub const LOW_SEVERITY_REASSURANCE: &str =
    "No major issues detected from security checks. It appears safe, but use normal caution online.";

/// Wording that implies the site is actively dangerous.
const HIGH_SEVERITY_CUES: &[&str] = &[
    "avoid",
    "do not visit",
    "malware",
    "virus",
    "phishing",
    "ransomware",
    "dangerous",
    "harmful",
    "deceptive",
    "unsafe",
    "pirated",
    "cracked",
    "unofficial software",
];

/// Wording that implies elevated but not confirmed risk.
const MEDIUM_SEVERITY_CUES: &[&str] = &[
    "suspicious",
    "be cautious",
    "use caution",
    "unknown trust",
    "unverified",
    "potentially risky",
    "could be risky",
];

/// Reassuring phrases that must not survive a high-severity verdict.
const REASSURING_PHRASES: &[&str] = &[
    "seems safe",
    "safe to use",
    "appears safe",
    "likely safe",
    "not flagged",
];

/// Alarming phrases that must not survive a low-severity verdict.
const ALARMING_PHRASES: &[&str] = &["dangerous", "high risk", "malware", "phishing"];

/// Pass A: minimum risk score implied by the narrative's wording.
/// High-severity cues floor at 70, medium at 40, otherwise 0.
pub fn narrative_floor(narrative: &str) -> u8 {
    let lowered = narrative.to_lowercase();
    if HIGH_SEVERITY_CUES.iter().any(|cue| lowered.contains(cue)) {
        return 70;
    }
    if MEDIUM_SEVERITY_CUES.iter().any(|cue| lowered.contains(cue)) {
        return 40;
    }
    0
}

/// Pass B: rewrite the narrative when its tone contradicts the tier. The
/// replacement is a whole fixed sentence, not a word-level patch, so the
/// output can never half-contradict itself.
pub fn reconcile(narrative: &str, tier: SeverityTier) -> String {
    let trimmed = narrative.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let lowered = trimmed.to_lowercase();

    match tier {
        SeverityTier::High => {
            if REASSURING_PHRASES.iter().any(|p| lowered.contains(p)) {
                return HIGH_SEVERITY_DISCLAIMER.to_string();
            }
        }
        SeverityTier::Low => {
            if ALARMING_PHRASES.iter().any(|p| lowered.contains(p)) {
                return LOW_SEVERITY_REASSURANCE.to_string();
            }
        }
        SeverityTier::Medium => {}
    }
    trimmed.to_string()
}

/// Final score under the floor invariant: never below the computed score,
/// never below the narrative floor.
pub fn apply_floor(computed: u8, floor: u8) -> u8 {
    computed.max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_high_cues_win_over_medium() {
        assert_eq!(narrative_floor("This is a PHISHING page, be cautious."), 70);
        assert_eq!(narrative_floor("Looks suspicious, use caution."), 40);
        assert_eq!(narrative_floor("Nothing remarkable here."), 0);
        assert_eq!(narrative_floor(""), 0);
    }

    #[test]
    fn floor_is_case_insensitive() {
        assert_eq!(narrative_floor("Distributes Pirated software."), 70);
        assert_eq!(narrative_floor("UNVERIFIED storefront."), 40);
    }

    #[test]
    fn apply_floor_is_monotonic() {
        for computed in [0u8, 10, 40, 69, 70, 100] {
            for floor in [0u8, 40, 70] {
                let fin = apply_floor(computed, floor);
                assert!(fin >= computed);
                assert!(fin >= floor);
            }
        }
    }

    #[test]
    fn high_tier_neutralizes_reassuring_phrases() {
        for text in [
            "This site seems safe overall.",
            "Appears safe and well established.",
            "It was not flagged by any engine.",
        ] {
            assert_eq!(
                reconcile(text, SeverityTier::High),
                HIGH_SEVERITY_DISCLAIMER
            );
        }
    }

    #[test]
    fn low_tier_neutralizes_alarming_phrases() {
        for text in [
            "This is a dangerous website.",
            "Likely hosting malware.",
            "A classic phishing setup.",
            "Considered high risk by us.",
        ] {
            assert_eq!(reconcile(text, SeverityTier::Low), LOW_SEVERITY_REASSURANCE);
        }
    }

    #[test]
    fn consistent_narratives_pass_through() {
        let high = "Multiple engines flag this page; avoid entering credentials.";
        assert_eq!(reconcile(high, SeverityTier::High), high);

        let low = "No issues found by the configured checks.";
        assert_eq!(reconcile(low, SeverityTier::Low), low);

        let medium = "Some signals look suspicious; use caution.";
        assert_eq!(reconcile(medium, SeverityTier::Medium), medium);
    }

    #[test]
    fn empty_narrative_passes_through() {
        assert_eq!(reconcile("   ", SeverityTier::High), "");
    }

    #[test]
    fn enforced_text_carries_no_banned_phrases_for_its_tier() {
        // The fixed replacements themselves must satisfy the invariant.
        let high = HIGH_SEVERITY_DISCLAIMER.to_lowercase();
        for p in REASSURING_PHRASES {
            assert!(!high.contains(p));
        }
        let low = LOW_SEVERITY_REASSURANCE.to_lowercase();
        for p in ALARMING_PHRASES {
            assert!(!low.contains(p));
        }
    }

    #[test]
    fn reconcile_is_idempotent_per_tier() {
        for (text, tier) in [
            ("This site seems safe.", SeverityTier::High),
            ("Full of malware.", SeverityTier::Low),
            ("Use caution here.", SeverityTier::Medium),
        ] {
            let once = reconcile(text, tier);
            let twice = reconcile(&once, tier);
            assert_eq!(once, twice);
        }
    }
}
