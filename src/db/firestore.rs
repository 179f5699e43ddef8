// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Occurrences (imported monthly batches, keyed by occurrence id)
//! - Abatement statuses (actions recorded against occurrence ids)
//! - Consents (append-only LGPD history)
//! - Audit logs (best-effort access trail)

use crate::db::collections;
use crate::error::{codes, AppError};
use crate::models::{AbatementStatus, ConsentRecord, Occurrence};
use crate::services::audit::AuditLog;
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Occurrence Operations ───────────────────────────────────

    /// Get every imported occurrence.
    pub async fn get_all_occurrences(&self) -> Result<Vec<Occurrence>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::OCCURRENCES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get occurrences for one monthly batch.
    pub async fn get_occurrences_by_month(
        &self,
        month: &str,
        year: i32,
    ) -> Result<Vec<Occurrence>, AppError> {
        let month = month.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::OCCURRENCES)
            .filter(move |q| {
                q.for_all([q.field("month").eq(month.clone()), q.field("year").eq(year)])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get one occurrence by id.
    pub async fn get_occurrence(&self, id: &str) -> Result<Option<Occurrence>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::OCCURRENCES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace one occurrence document (keyed by its id).
    pub async fn upsert_occurrence(&self, occurrence: &Occurrence) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::OCCURRENCES)
            .document_id(&occurrence.id)
            .object(occurrence)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Store a batch of occurrences.
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    pub async fn batch_upsert_occurrences(
        &self,
        occurrences: &[Occurrence],
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(occurrences.to_vec())
            .map(|occurrence| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::OCCURRENCES)
                    .document_id(&occurrence.id)
                    .object(&occurrence)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    /// Toggle the abatement flag on a stored occurrence, attributed to the
    /// acting staff member. Fetch-modify-write to preserve other fields.
    ///
    /// Fails with `OCCURRENCE_NOT_FOUND` when the document does not exist
    /// (e.g. the record only lives in fallback files).
    pub async fn set_occurrence_abatement(
        &self,
        id: &str,
        is_abated_or_removed: bool,
        action_by: &str,
        action_at: i64,
    ) -> Result<Occurrence, AppError> {
        let mut occurrence = self.get_occurrence(id).await?.ok_or_else(|| {
            AppError::not_found(
                codes::OCCURRENCE_NOT_FOUND,
                format!("Occurrence {} not found", id),
            )
        })?;

        occurrence.is_abated_or_removed = is_abated_or_removed;
        occurrence.action_by = Some(action_by.to_string());
        occurrence.action_at = Some(action_at);

        self.upsert_occurrence(&occurrence).await?;
        Ok(occurrence)
    }

    // ─── Abatement Status Overlay ────────────────────────────────

    /// Record an abatement action keyed by occurrence id, for records that
    /// only exist in the fallback files.
    pub async fn set_abatement_status(&self, status: &AbatementStatus) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::OCCURRENCE_STATUS)
            .document_id(&status.id)
            .object(status)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All recorded abatement statuses.
    pub async fn list_abatement_statuses(&self) -> Result<Vec<AbatementStatus>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::OCCURRENCE_STATUS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Consent Operations ──────────────────────────────────────

    /// Append a consent record. Records are never updated in place.
    pub async fn add_consent(&self, record: &ConsentRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CONSENTS)
            .document_id(record.document_id())
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Full consent history for a user, unordered.
    ///
    /// Sorting happens in the service to avoid a composite index.
    pub async fn get_consents_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConsentRecord>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CONSENTS)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Audit Operations ────────────────────────────────────────

    /// Append an audit log entry.
    pub async fn add_audit_log(&self, log: &AuditLog) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::AUDIT_LOGS)
            .document_id(log.document_id())
            .object(log)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
