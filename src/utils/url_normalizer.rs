// ZB-31: Canonical URL form shared by the cache, the providers and the
// quick scanner. One rule everywhere: trimmed, https-forced, host lowercased,
// query/fragment stripped, default port elided.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Invalid URL format: {0}")]
    Malformed(String),
}

/// Canonical string form of a URL. This is the cache key and the identity
/// used to deduplicate provider work, so two spellings of the same resource
/// must collapse to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host of the normalized URL, used by the domain-scoped providers.
    /// `None` only for degenerate hosts the registries cannot look up.
    pub fn domain(&self) -> Option<String> {
        Url::parse(&self.0)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NormalizedUrl> for String {
    fn from(value: NormalizedUrl) -> Self {
        value.0
    }
}

/// Normalize a user-supplied string into a canonical https URL.
///
/// Rules: trim whitespace; prepend `https://` when no scheme is present;
/// parse; force the scheme to `https`; the `url` crate lowercases the host
/// and drops default ports; strip query string and fragment; an empty path
/// serializes as `/`. Idempotent over its own output.
pub fn normalize(input: &str) -> Result<NormalizedUrl, NormalizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Malformed(input.to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url =
        Url::parse(&candidate).map_err(|e| NormalizeError::Malformed(e.to_string()))?;

    if url.host_str().is_none() {
        return Err(NormalizeError::Malformed(format!(
            "no host in {}",
            trimmed
        )));
    }

    url.set_scheme("https")
        .map_err(|_| NormalizeError::Malformed(format!("unsupported scheme in {}", trimmed)))?;
    // An explicit :443 survives the scheme switch; elide it now that it is
    // the default again.
    if url.port() == Some(443) {
        let _ = url.set_port(None);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(NormalizedUrl(url.to_string()))
}
