// Lexical URL heuristics for the quick scanner. Deliberately simple: these
// run on every scan request without any network call, so they only look at
// the shape of the string the user submitted.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    /// Hosts that are nothing but digits and dots read as IP literals.
    static ref IP_HOST_PATTERN: Regex =
        Regex::new(r"^[0-9.]+$").expect("Invalid IP host pattern regex");
}

const SENSITIVE_KEYWORDS: &[&str] = &["login", "verify", "secure", "update"];

#[derive(Debug, Clone, Default)]
pub struct HeuristicReport {
    pub reasons: Vec<String>,
}

impl HeuristicReport {
    pub fn is_suspicious(&self) -> bool {
        !self.reasons.is_empty()
    }
}

/// Inspect the raw user-submitted URL for common phishing tells. Host-level
/// checks only run when the string parses as an absolute URL; the lexical
/// checks always run.
pub fn evaluate(raw_url: &str) -> HeuristicReport {
    let mut reasons = Vec::new();
    let lower = raw_url.to_lowercase();

    if lower.contains('@') {
        reasons.push(
            "URL contains \"@\" which can be used to obscure the real destination".to_string(),
        );
    }
    if lower.contains("xn--") {
        reasons
            .push("URL contains punycode which can be used for lookalike domains".to_string());
    }
    if SENSITIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        reasons.push(
            "URL contains sensitive keywords often used in phishing (login/verify/secure/update)"
                .to_string(),
        );
    }

    if let Ok(url) = Url::parse(raw_url) {
        if let Some(host) = url.host_str() {
            if host.len() > 60 {
                reasons.push("Domain name is unusually long".to_string());
            }
            if host.split('.').count() > 4 {
                reasons.push(
                    "Domain has many subdomains, which can be used to mimic trusted sites"
                        .to_string(),
                );
            }
            if IP_HOST_PATTERN.is_match(host) {
                reasons.push(
                    "Domain looks like an IP address, which is often used in malicious links"
                        .to_string(),
                );
            }
        }
        if url.query().map(|q| q.len() > 100).unwrap_or(false) {
            reasons.push(
                "URL has a very long query string, which may hide tracking or malicious parameters"
                    .to_string(),
            );
        }
    }

    HeuristicReport { reasons }
}
