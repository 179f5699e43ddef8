// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; there is no hot reload.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL, used for CORS and for building reset links
    pub frontend_url: String,
    /// GCP project ID for Firestore
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,

    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,

    /// Firebase Auth REST API key. When absent the identity provider is
    /// treated as offline and account lookup falls back to `known_accounts`.
    pub firebase_api_key: Option<String>,
    /// Base URL of the identity provider (overridable for tests)
    pub firebase_auth_url: String,
    /// Allow-list of account emails used when the provider is offline
    pub known_accounts: Vec<String>,

    /// Directory holding the per-month fallback JSON files
    pub data_dir: String,

    /// Reset-token lifetime in seconds
    pub token_ttl_secs: i64,
    /// Interval between expired-token sweeps in seconds
    pub sweep_interval_secs: u64,
    /// Fixed-window size for reset-link rate limiting, in seconds
    pub rate_limit_window_secs: i64,
    /// Max reset-link requests per client per window
    pub rate_limit_max: u32,

    /// Current LGPD policy document version; consents recorded against an
    /// older version are stale.
    pub consent_document_version: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),

            firebase_api_key: env::var("FIREBASE_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            firebase_auth_url: env::var("FIREBASE_AUTH_URL")
                .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".to_string()),
            known_accounts: env::var("KNOWN_ACCOUNTS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),

            token_ttl_secs: parse_env_or("TOKEN_TTL_SECS", 3600),
            sweep_interval_secs: parse_env_or("SWEEP_INTERVAL_SECS", 300),
            rate_limit_window_secs: parse_env_or("RATE_LIMIT_WINDOW_SECS", 900),
            rate_limit_max: parse_env_or("RATE_LIMIT_MAX", 5),

            consent_document_version: env::var("CONSENT_DOCUMENT_VERSION")
                .unwrap_or_else(|_| "1.0".to_string()),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            firebase_api_key: None,
            firebase_auth_url: "http://localhost:9099/identitytoolkit.googleapis.com/v1"
                .to_string(),
            known_accounts: vec![
                "staff@clube.com.br".to_string(),
                "social@clube.com.br".to_string(),
            ],
            data_dir: "data".to_string(),
            token_ttl_secs: 3600,
            sweep_interval_secs: 300,
            rate_limit_window_secs: 900,
            rate_limit_max: 5,
            consent_document_version: "1.0".to_string(),
        }
    }
}

fn parse_env_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("KNOWN_ACCOUNTS", "Staff@Clube.com.br, social@clube.com.br,");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.token_ttl_secs, 3600);
        assert_eq!(config.rate_limit_max, 5);
        // Allow-list entries are lowercased and empty segments dropped
        assert_eq!(
            config.known_accounts,
            vec!["staff@clube.com.br", "social@clube.com.br"]
        );
    }
}
