// SPDX-License-Identifier: MIT

//! LGPD consent gate for data routes.
//!
//! Runs after authentication; the consent endpoints themselves are not
//! behind this gate so a blocked user can still grant consent.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that rejects users without a valid consent record for the
/// current document version.
pub async fn require_consent(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AppError::Unauthorized)?;

    if state.consent_service.needs_consent(&user.user_id).await {
        tracing::info!(user_id = %user.user_id, "Blocked by consent gate");
        return Err(AppError::ConsentRequired);
    }

    Ok(next.run(request).await)
}
