// SPDX-License-Identifier: MIT

//! Protected occurrence, stats, and report endpoints.

use crate::error::{codes, AppError};
use crate::middleware::auth::AuthUser;
use crate::models::occurrence::normalize;
use crate::models::{stats, AbatementStatus, AthleteTotals, Occurrence, RawOccurrence};
use crate::services::audit::AuditLog;
use crate::services::occurrences::Grouping;
use crate::services::report;
use crate::AppState;
use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/occurrences", get(list_occurrences))
        .route("/api/occurrences/months", get(list_months))
        .route("/api/occurrences/import", post(import_occurrences))
        .route("/api/occurrences/{id}/abatement", patch(set_abatement))
        .route("/api/stats/athletes", get(athlete_stats))
        .route("/api/reports/athlete", get(athlete_report))
}

#[derive(Deserialize)]
struct OccurrenceQuery {
    month: Option<String>,
    year: Option<i32>,
}

#[derive(Serialize)]
struct OccurrenceListResponse {
    occurrences: Vec<Occurrence>,
    totals: stats::OccurrenceTotals,
}

/// GET /api/occurrences?month=Janeiro&year=2025
async fn list_occurrences(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OccurrenceQuery>,
) -> Result<Json<OccurrenceListResponse>, AppError> {
    let occurrences = match (query.month, query.year) {
        (Some(month), Some(year)) => state.occurrence_service.month_data(&month, year).await,
        _ => state.occurrence_service.load_all().await,
    };

    let totals = stats::totals(&occurrences);

    Ok(Json(OccurrenceListResponse {
        occurrences,
        totals,
    }))
}

#[derive(Serialize)]
struct MonthListResponse {
    months: Vec<Grouping>,
}

/// GET /api/occurrences/months
async fn list_months(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MonthListResponse>, AppError> {
    let months = state.occurrence_service.available_groupings().await;
    Ok(Json(MonthListResponse { months }))
}

#[derive(Deserialize, Validate)]
struct ImportRequest {
    #[validate(length(min = 1, message = "Month is required"))]
    month: String,
    #[validate(range(min = 2000, max = 2100, message = "Year out of range"))]
    year: i32,
    #[validate(length(min = 1, message = "At least one row is required"))]
    rows: Vec<RawOccurrence>,
}

#[derive(Serialize)]
struct ImportResponse {
    imported: usize,
    month: String,
    year: i32,
}

/// POST /api/occurrences/import
///
/// Normalizes a raw monthly batch and upserts it. Ids are content-derived,
/// so re-importing the same batch overwrites rather than duplicates.
async fn import_occurrences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::validation(codes::MISSING_FIELDS, e.to_string()))?;

    let occurrences: Vec<Occurrence> = payload
        .rows
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let mut occ = normalize(raw, index);
            occ.month = Some(payload.month.clone());
            occ.year = Some(payload.year);
            occ
        })
        .collect();

    let result = state.db.batch_upsert_occurrences(&occurrences).await;

    let mut entry = AuditLog::new(
        &user.user_id,
        &user.email,
        "occurrences_imported",
        "monthly_batch",
        &format!("{}_{}", payload.month, payload.year),
    );
    if let Err(e) = &result {
        entry.success = false;
        entry.error_message = Some(e.to_string());
    }
    state.audit_service.log(entry).await;

    result?;

    tracing::info!(
        month = %payload.month,
        year = payload.year,
        count = occurrences.len(),
        "Monthly batch imported"
    );

    Ok(Json(ImportResponse {
        imported: occurrences.len(),
        month: payload.month,
        year: payload.year,
    }))
}

#[derive(Deserialize)]
struct AbatementRequest {
    is_abated_or_removed: bool,
}

#[derive(Serialize)]
struct AbatementResponse {
    id: String,
    is_abated_or_removed: bool,
    action_by: String,
    action_at: i64,
}

/// PATCH /api/occurrences/{id}/abatement
///
/// Updates the stored document when it exists; for records that only live
/// in fallback files, records a status keyed by id that gets overlaid at
/// load time.
async fn set_abatement(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<AbatementRequest>,
) -> Result<Json<AbatementResponse>, AppError> {
    let action_at = Utc::now().timestamp_millis();

    let result = state
        .db
        .set_occurrence_abatement(&id, payload.is_abated_or_removed, &user.email, action_at)
        .await;

    let result = match result {
        Ok(_) => Ok(()),
        Err(AppError::NotFound { code, .. }) if code == codes::OCCURRENCE_NOT_FOUND => {
            // Fallback-only record: keep the action in the status overlay
            state
                .db
                .set_abatement_status(&AbatementStatus {
                    id: id.clone(),
                    is_abated_or_removed: payload.is_abated_or_removed,
                    action_by: user.email.clone(),
                    action_at,
                })
                .await
        }
        Err(e) => Err(e),
    };

    let mut entry = AuditLog::new(
        &user.user_id,
        &user.email,
        "abatement_toggle",
        "occurrence",
        &id,
    );
    if let Err(e) = &result {
        entry.success = false;
        entry.error_message = Some(e.to_string());
    }
    state.audit_service.log(entry).await;

    result?;

    Ok(Json(AbatementResponse {
        id,
        is_abated_or_removed: payload.is_abated_or_removed,
        action_by: user.email,
        action_at,
    }))
}

#[derive(Serialize)]
struct AthleteStatsResponse {
    athletes: Vec<AthleteTotals>,
}

/// GET /api/stats/athletes
async fn athlete_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AthleteStatsResponse>, AppError> {
    let occurrences = state.occurrence_service.load_all().await;
    Ok(Json(AthleteStatsResponse {
        athletes: stats::totals_by_athlete(&occurrences),
    }))
}

#[derive(Deserialize)]
struct ReportQuery {
    athlete: Option<String>,
    month: Option<String>,
    year: Option<i32>,
}

/// GET /api/reports/athlete?athlete=João Silva&month=Janeiro&year=2025
async fn athlete_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<crate::models::ReportDocument>, AppError> {
    let (Some(athlete), Some(month), Some(year)) = (query.athlete, query.month, query.year) else {
        return Err(AppError::validation(
            codes::MISSING_FIELDS,
            "athlete, month and year are required",
        ));
    };

    let occurrences: Vec<Occurrence> = state
        .occurrence_service
        .month_data(&month, year)
        .await
        .into_iter()
        .filter(|o| o.athlete_name == athlete)
        .collect();

    let category = occurrences
        .first()
        .map(|o| o.category.clone())
        .unwrap_or_default();

    let document = report::build_athlete_report(
        &athlete,
        &category,
        &month,
        year,
        &occurrences,
        Utc::now(),
    );

    state
        .audit_service
        .log(AuditLog::new(
            &user.user_id,
            &user.email,
            "report_generated",
            "athlete_report",
            &format!("{athlete}_{month}_{year}"),
        ))
        .await;

    Ok(Json(document))
}
