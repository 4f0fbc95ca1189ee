// Centralized configuration management.
// Load ALL env vars ONCE at startup; components receive their settings by
// value at construction so they stay testable.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // For tests, load .env file first
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Complete application configuration. Provider credentials are optional by
/// design: a missing key just makes that provider report Unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Server
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,

    // Storage: absent REDIS_URL means in-memory stores (single instance)
    pub redis_url: Option<String>,

    // Provider credentials
    pub virustotal_api_key: Option<String>,
    pub safe_browsing_api_key: Option<String>,
    pub whoisxml_api_key: Option<String>,
    pub urlscan_api_key: Option<String>,

    // Narrative generation
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,

    // Caching
    pub scan_cache_ttl_days: i64,

    // Rate limiting
    pub enable_rate_limiting: bool,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,

    // CORS
    pub cors_allowed_origins: Vec<String>,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080)?,
            environment: Environment::from(
                env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            ),
            rust_log: env::var("RUST_LOG")
                .unwrap_or_else(|_| "zerobait_backend_core=debug,tower_http=info".to_string()),

            redis_url: optional_var("REDIS_URL"),

            virustotal_api_key: optional_var("VIRUSTOTAL_API_KEY"),
            safe_browsing_api_key: optional_var("GOOGLE_SAFE_BROWSING_API_KEY"),
            whoisxml_api_key: optional_var("WHOISXML_API_KEY"),
            urlscan_api_key: optional_var("URLSCAN_API_KEY"),

            gemini_api_key: optional_var("GEMINI_API_KEY"),
            gemini_model: optional_var("GEMINI_MODEL"),

            scan_cache_ttl_days: parse_var("SCAN_CACHE_TTL_DAYS", 30)?,

            enable_rate_limiting: parse_var("ENABLE_RATE_LIMITING", true)?,
            rate_limit_max_requests: parse_var("RATE_LIMIT_MAX_REQUESTS", 30)?,
            rate_limit_window_seconds: parse_var("RATE_LIMIT_WINDOW_SECONDS", 60)?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Missing and empty are both "not configured".
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!(Environment::from("prod".to_string()), Environment::Production);
        assert_eq!(Environment::from("DEV".to_string()), Environment::Development);
        assert_eq!(Environment::from("weird".to_string()), Environment::Development);
    }
}
