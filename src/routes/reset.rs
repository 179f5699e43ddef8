// SPDX-License-Identifier: MIT

//! Public password-reset endpoints.
//!
//! These sit outside the session/consent layers: the whole point is that
//! the caller is locked out. Abuse is bounded by the per-client rate
//! limit on link generation.

use crate::error::{codes, AppError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-reset-link", post(generate_reset_link))
        .route("/validate-token/{token}", get(validate_token))
        .route("/reset-password", post(reset_password))
}

/// Rate-limit key for a request: first `X-Forwarded-For` hop, or a shared
/// bucket when the proxy strips it.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Deserialize)]
struct GenerateResetLinkRequest {
    email: Option<String>,
}

#[derive(Serialize)]
struct GenerateResetLinkResponse {
    success: bool,
    #[serde(rename = "resetLink")]
    reset_link: String,
    email: String,
    message: String,
}

/// POST /generate-reset-link
async fn generate_reset_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GenerateResetLinkRequest>,
) -> Result<Json<GenerateResetLinkResponse>, AppError> {
    // Rate limit counts every attempt, valid or not
    state.rate_limiter.check(&client_key(&headers))?;

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation(codes::MISSING_EMAIL, "Email is required"))?;

    let issued = state.reset_service.issue(email).await?;

    Ok(Json(GenerateResetLinkResponse {
        success: true,
        reset_link: issued.reset_link,
        email: issued.email,
        message: "Reset link generated".to_string(),
    }))
}

#[derive(Serialize)]
struct ValidateTokenResponse {
    success: bool,
    email: String,
    message: String,
}

/// GET /validate-token/{token}
async fn validate_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ValidateTokenResponse>, AppError> {
    let email = state.reset_service.validate(&token)?;
    Ok(Json(ValidateTokenResponse {
        success: true,
        email,
        message: "Token is valid".to_string(),
    }))
}

#[derive(Deserialize)]
struct ResetPasswordRequest {
    token: Option<String>,
    #[serde(alias = "newPassword")]
    password: Option<String>,
}

#[derive(Serialize)]
struct ResetPasswordResponse {
    success: bool,
    email: String,
    message: String,
    #[serde(rename = "firebaseUpdated", skip_serializing_if = "Option::is_none")]
    firebase_updated: Option<bool>,
    #[serde(rename = "firebaseError", skip_serializing_if = "Option::is_none")]
    firebase_error: Option<String>,
}

/// POST /reset-password
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    let (Some(token), Some(password)) = (
        payload.token.as_deref().filter(|t| !t.trim().is_empty()),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation(
            codes::MISSING_FIELDS,
            "Token and new password are required",
        ));
    };

    let outcome = state.reset_service.consume(token, password).await?;

    Ok(Json(ResetPasswordResponse {
        success: true,
        email: outcome.email,
        message: "Password reset successfully".to_string(),
        firebase_updated: outcome.provider_updated,
        firebase_error: outcome.provider_error,
    }))
}
