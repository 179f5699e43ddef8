// SPDX-License-Identifier: MIT

//! Password-reset token lifecycle: issue → validate → consume → expire.
//!
//! Tokens are memory-only and lost on restart; a periodic sweep evicts
//! expired ones. The store sits behind a trait so a multi-instance
//! deployment could back it with an external keyed store while keeping
//! single-writer semantics per key.

use crate::error::{codes, AppError};
use crate::services::firebase_auth::FirebaseAuthClient;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

const TOKEN_BYTES: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;

/// A single-use, time-limited credential proving control of an email.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

/// Keyed token storage. Implementations must keep single-writer semantics
/// per token key.
pub trait TokenStore: Send + Sync {
    fn get(&self, token: &str) -> Option<ResetToken>;
    /// Insert or replace a record under its token key.
    fn put(&self, record: ResetToken);
    fn remove(&self, token: &str);
    /// Drop every token issued for an email (live-token-per-email invariant).
    fn remove_for_email(&self, email: &str);
    /// Evict all tokens past expiry, used or not. Returns the count evicted.
    fn sweep_expired(&self, now: DateTime<Utc>) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory token store.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<String, ResetToken>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, token: &str) -> Option<ResetToken> {
        self.tokens.get(token).map(|r| r.clone())
    }

    fn put(&self, record: ResetToken) {
        self.tokens.insert(record.token.clone(), record);
    }

    fn remove(&self, token: &str) {
        self.tokens.remove(token);
    }

    fn remove_for_email(&self, email: &str) {
        self.tokens.retain(|_, record| record.email != email);
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, record| record.expires_at >= now);
        before - self.tokens.len()
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// Result of issuing a reset link.
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub email: String,
    pub reset_link: String,
}

/// Result of consuming a token.
///
/// Local consumption is authoritative: `provider_updated = Some(false)`
/// means the token is spent but the new credential did not reach the
/// identity provider, and the caller must surface that.
#[derive(Debug, Clone)]
pub struct ConsumeOutcome {
    pub email: String,
    /// None when no provider is configured (nothing to propagate to)
    pub provider_updated: Option<bool>,
    pub provider_error: Option<String>,
}

/// Issues, validates, and consumes reset tokens.
pub struct ResetService {
    store: Arc<dyn TokenStore>,
    auth: FirebaseAuthClient,
    known_accounts: Vec<String>,
    frontend_url: String,
    token_ttl: Duration,
    rng: SystemRandom,
}

impl ResetService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        auth: FirebaseAuthClient,
        known_accounts: Vec<String>,
        frontend_url: impl Into<String>,
        token_ttl_secs: i64,
    ) -> Self {
        Self {
            store,
            auth,
            known_accounts,
            frontend_url: frontend_url.into(),
            token_ttl: Duration::seconds(token_ttl_secs),
            rng: SystemRandom::new(),
        }
    }

    /// Issue a fresh token for `email`, invalidating any prior tokens for
    /// that address.
    pub async fn issue(&self, email: &str) -> Result<IssuedReset, AppError> {
        self.issue_at(email, Utc::now()).await
    }

    pub async fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<IssuedReset, AppError> {
        let email = email.trim().to_lowercase();

        if !is_valid_email(&email) {
            return Err(AppError::validation(
                codes::INVALID_EMAIL_FORMAT,
                "Invalid email format",
            ));
        }

        if !self.account_exists(&email).await? {
            return Err(AppError::not_found(codes::USER_NOT_FOUND, "User not found"));
        }

        // At most one live token per email
        self.store.remove_for_email(&email);

        let token = self.generate_token()?;
        self.store.put(ResetToken {
            token: token.clone(),
            email: email.clone(),
            created_at: now,
            expires_at: now + self.token_ttl,
            used: false,
            used_at: None,
        });

        tracing::info!(email = %email, "Reset token issued");

        Ok(IssuedReset {
            reset_link: format!("{}/reset-password?token={}", self.frontend_url, token),
            email,
        })
    }

    /// Check a token without consuming it. Repeatable; evicts on expiry.
    pub fn validate(&self, token: &str) -> Result<String, AppError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::validation(
                codes::MISSING_TOKEN,
                "Token is required",
            ));
        }

        let record = self
            .store
            .get(token)
            .ok_or_else(|| AppError::not_found(codes::TOKEN_NOT_FOUND, "Invalid reset link"))?;

        if now > record.expires_at {
            self.store.remove(token);
            return Err(AppError::gone(
                codes::TOKEN_EXPIRED,
                "Reset link expired. Request a new one",
            ));
        }

        if record.used {
            return Err(AppError::gone(
                codes::TOKEN_USED,
                "Reset link already used. Request a new one",
            ));
        }

        Ok(record.email)
    }

    /// Consume a token and propagate the new credential.
    ///
    /// A token may expire between validation and submission, so the same
    /// checks run again here. Propagation failure does not roll back the
    /// consumption; both outcomes surface in the result.
    pub async fn consume(&self, token: &str, password: &str) -> Result<ConsumeOutcome, AppError> {
        self.consume_at(token, password, Utc::now()).await
    }

    pub async fn consume_at(
        &self,
        token: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, AppError> {
        let email = self.validate_at(token, now)?;

        check_password_policy(password)?;

        // Mark consumed before propagation so a provider failure cannot
        // leave the token replayable.
        let mut record = self
            .store
            .get(token)
            .ok_or_else(|| AppError::not_found(codes::TOKEN_NOT_FOUND, "Invalid reset link"))?;
        record.used = true;
        record.used_at = Some(now);
        self.store.put(record);

        let (provider_updated, provider_error) = if self.auth.is_configured() {
            match self.auth.update_password(&email, password).await {
                Ok(()) => (Some(true), None),
                Err(e) => {
                    tracing::warn!(email = %email, error = %e, "Credential propagation failed; token already consumed");
                    (Some(false), Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        tracing::info!(email = %email, provider_updated = ?provider_updated, "Reset token consumed");

        Ok(ConsumeOutcome {
            email,
            provider_updated,
            provider_error,
        })
    }

    /// Evict all expired tokens.
    pub fn sweep(&self) -> usize {
        self.store.sweep_expired(Utc::now())
    }

    /// Live token count (health counter).
    pub fn token_count(&self) -> usize {
        self.store.len()
    }

    /// Size of the configured account allow-list (health counter).
    pub fn known_account_count(&self) -> usize {
        self.known_accounts.len()
    }

    async fn account_exists(&self, email: &str) -> Result<bool, AppError> {
        if self.auth.is_configured() {
            self.auth.user_exists(email).await
        } else {
            Ok(self.known_accounts.iter().any(|a| a == email))
        }
    }

    fn generate_token(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        Ok(hex::encode(bytes))
    }
}

/// Spawn the periodic expired-token sweep.
///
/// The returned handle owns the task; dropping or stopping it ends the
/// sweep, tying the task to the service lifecycle instead of leaving a
/// free-running timer.
pub fn start_sweeper(store: Arc<dyn TokenStore>, interval: std::time::Duration) -> SweeperHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // the first tick fires immediately
        loop {
            ticker.tick().await;
            let evicted = store.sweep_expired(Utc::now());
            if evicted > 0 {
                tracing::info!(evicted, "Expired reset tokens evicted");
            }
        }
    });
    SweeperHandle { task }
}

/// Handle owning the background sweep task.
pub struct SweeperHandle {
    task: tokio::task::JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Syntactic email check: non-empty local part and domain, no whitespace,
/// and a dot somewhere in the domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
        && !domain.contains('@')
}

/// Password policy: length ≥ 6 and at least one alphabetic character.
fn check_password_policy(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN || !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AppError::validation(
            codes::WEAK_PASSWORD,
            "Password must be at least 6 characters and contain letters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    fn service() -> ResetService {
        let store = Arc::new(InMemoryTokenStore::new());
        // No API key: account checks use the allow-list
        let auth = FirebaseAuthClient::new("http://localhost:9099/v1", None);
        ResetService::new(
            store,
            auth,
            vec!["staff@clube.com.br".to_string()],
            "http://localhost:5173",
            3600,
        )
    }

    fn extract_token(issued: &IssuedReset) -> String {
        issued.reset_link.split("token=").nth(1).unwrap().to_string()
    }

    #[tokio::test]
    async fn test_issue_unknown_email_stores_nothing() {
        let svc = service();
        let err = svc.issue("nobody@clube.com.br").await.unwrap_err();
        assert_eq!(err.code(), codes::USER_NOT_FOUND);
        assert_eq!(svc.token_count(), 0);
    }

    #[tokio::test]
    async fn test_issue_invalid_format() {
        let svc = service();
        for bad in ["", "no-at-sign", "a@b", "a b@c.com", "a@.com"] {
            let err = svc.issue(bad).await.unwrap_err();
            assert_eq!(err.code(), codes::INVALID_EMAIL_FORMAT, "input: {bad:?}");
        }
        assert_eq!(svc.token_count(), 0);
    }

    #[tokio::test]
    async fn test_validate_returns_email_and_is_repeatable() {
        let svc = service();
        let issued = svc.issue("staff@clube.com.br").await.unwrap();
        let token = extract_token(&issued);

        for _ in 0..3 {
            assert_eq!(svc.validate(&token).unwrap(), "staff@clube.com.br");
        }
        assert_eq!(svc.token_count(), 1);
    }

    #[tokio::test]
    async fn test_reissue_invalidates_prior_token() {
        let svc = service();
        let first = svc.issue("staff@clube.com.br").await.unwrap();
        let first_token = extract_token(&first);
        let _second = svc.issue("staff@clube.com.br").await.unwrap();

        let err = svc.validate(&first_token).unwrap_err();
        assert_eq!(err.code(), codes::TOKEN_NOT_FOUND);
        assert_eq!(svc.token_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_evicted_on_validate() {
        let svc = service();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        let issued = svc
            .issue_at("staff@clube.com.br", two_hours_ago)
            .await
            .unwrap();
        let token = extract_token(&issued);

        let err = svc.validate(&token).unwrap_err();
        assert_eq!(err.code(), codes::TOKEN_EXPIRED);
        // Evicted on the failed attempt, so a retry sees NotFound
        let err = svc.validate(&token).unwrap_err();
        assert_eq!(err.code(), codes::TOKEN_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_expired_token_rejected_on_consume() {
        let svc = service();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        let issued = svc
            .issue_at("staff@clube.com.br", two_hours_ago)
            .await
            .unwrap();
        let token = extract_token(&issued);

        let err = svc.consume(&token, "abc123").await.unwrap_err();
        assert_eq!(err.code(), codes::TOKEN_EXPIRED);
    }

    #[tokio::test]
    async fn test_double_consume_fails_already_used() {
        let svc = service();
        let issued = svc.issue("staff@clube.com.br").await.unwrap();
        let token = extract_token(&issued);

        let outcome = svc.consume(&token, "abc123").await.unwrap();
        assert_eq!(outcome.email, "staff@clube.com.br");
        // No provider configured, so nothing was propagated
        assert_eq!(outcome.provider_updated, None);

        let err = svc.consume(&token, "abc123").await.unwrap_err();
        assert_eq!(err.code(), codes::TOKEN_USED);
    }

    #[tokio::test]
    async fn test_password_policy() {
        let svc = service();

        for weak in ["abc", "123456"] {
            let issued = svc.issue("staff@clube.com.br").await.unwrap();
            let token = extract_token(&issued);
            let err = svc.consume(&token, weak).await.unwrap_err();
            assert_eq!(err.code(), codes::WEAK_PASSWORD, "password: {weak:?}");
            // Rejection must not consume the token
            assert!(svc.validate(&token).is_ok());
        }

        let issued = svc.issue("staff@clube.com.br").await.unwrap();
        let token = extract_token(&issued);
        assert!(svc.consume(&token, "abc123").await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_including_used() {
        let svc = service();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        svc.issue_at("staff@clube.com.br", two_hours_ago)
            .await
            .unwrap();
        assert_eq!(svc.token_count(), 1);

        assert_eq!(svc.sweep(), 1);
        assert_eq!(svc.token_count(), 0);
    }

    #[tokio::test]
    async fn test_tokens_are_unique_and_opaque() {
        let svc = service();
        let a = extract_token(&svc.issue("staff@clube.com.br").await.unwrap());
        let b = extract_token(&svc.issue("staff@clube.com.br").await.unwrap());
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_BYTES * 2); // hex-encoded
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.com.br"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("us er@example.com"));
    }
}
