// SPDX-License-Identifier: MIT

//! Consent endpoints.
//!
//! Authenticated but deliberately outside the consent gate, otherwise a
//! blocked user could never grant consent.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::ConsentRecord;
use crate::AppState;
use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/consent/status", get(consent_status))
        .route("/api/consent", post(record_consent))
        .route("/api/consent/history", get(consent_history))
}

#[derive(Serialize)]
struct ConsentStatusResponse {
    needs_consent: bool,
    current_version: String,
}

/// GET /api/consent/status
async fn consent_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConsentStatusResponse>, AppError> {
    let needs_consent = state.consent_service.needs_consent(&user.user_id).await;
    Ok(Json(ConsentStatusResponse {
        needs_consent,
        current_version: state.consent_service.current_version().to_string(),
    }))
}

#[derive(Deserialize)]
struct RecordConsentRequest {
    consented: bool,
    session_id: Option<String>,
}

/// POST /api/consent
async fn record_consent(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RecordConsentRequest>,
) -> Result<Json<ConsentRecord>, AppError> {
    let record = state
        .consent_service
        .record(
            &user.user_id,
            &user.email,
            payload.consented,
            payload.session_id,
        )
        .await?;

    Ok(Json(record))
}

#[derive(Serialize)]
struct ConsentHistoryResponse {
    records: Vec<ConsentRecord>,
}

/// GET /api/consent/history
async fn consent_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConsentHistoryResponse>, AppError> {
    let records = state.consent_service.history(&user.user_id).await?;
    Ok(Json(ConsentHistoryResponse { records }))
}
