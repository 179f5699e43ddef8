// SPDX-License-Identifier: MIT

//! Firebase Auth REST client for account lookup and credential updates.
//!
//! Handles:
//! - Checking whether an email belongs to a known account
//! - Propagating a new password after local token consumption
//!
//! When no API key is configured the client reports itself offline and
//! callers fall back to the configured allow-list.

use crate::error::AppError;
use serde::Deserialize;

/// Firebase Auth REST API client.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
}

impl FirebaseAuthClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Whether the provider can be reached at all (an API key is set).
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("Firebase API key not configured".to_string()))
    }

    /// Check whether an account exists for `email`.
    pub async fn user_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.lookup_user(email).await?.is_some())
    }

    /// Look up the provider-side id (`localId`) for an email.
    async fn lookup_user(&self, email: &str) -> Result<Option<String>, AppError> {
        let url = format!("{}/accounts:lookup?key={}", self.base_url, self.key()?);

        let body = serde_json::json!({ "email": [email] });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Account lookup request failed: {}", e)))?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            // The provider signals an unknown email as a client error
            if detail.contains("EMAIL_NOT_FOUND") {
                return Ok(None);
            }
            return Err(AppError::Upstream(format!(
                "Account lookup failed: {}",
                detail
            )));
        }

        let parsed: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Account lookup parse error: {}", e)))?;

        Ok(parsed.users.into_iter().next().map(|u| u.local_id))
    }

    /// Set a new password for the account behind `email`.
    pub async fn update_password(&self, email: &str, password: &str) -> Result<(), AppError> {
        let local_id = self.lookup_user(email).await?.ok_or_else(|| {
            AppError::Upstream(format!("No provider account for {} during update", email))
        })?;

        let url = format!("{}/accounts:update?key={}", self.base_url, self.key()?);

        let body = serde_json::json!({
            "localId": local_id,
            "password": password,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Password update request failed: {}", e)))?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Password update failed: {}",
                detail
            )));
        }

        tracing::info!("Password propagated to identity provider");
        Ok(())
    }
}
