// SPDX-License-Identifier: MIT

//! LGPD consent gate over the consent history collection.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::consent::{needs_consent, ConsentRecord};
use chrono::Utc;

/// Evaluates and records user consent against the current policy version.
#[derive(Clone)]
pub struct ConsentService {
    db: FirestoreDb,
    current_version: String,
}

impl ConsentService {
    pub fn new(db: FirestoreDb, current_version: impl Into<String>) -> Self {
        Self {
            db,
            current_version: current_version.into(),
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Whether the gate should block this user.
    ///
    /// Fails closed: if the history cannot be read, consent is required.
    pub async fn needs_consent(&self, user_id: &str) -> bool {
        match self.db.get_consents_for_user(user_id).await {
            Ok(records) => needs_consent(&records, &self.current_version),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Consent lookup failed, requiring consent");
                true
            }
        }
    }

    /// Append the user's choice as a new immutable record.
    pub async fn record(
        &self,
        user_id: &str,
        user_email: &str,
        consented: bool,
        session_id: Option<String>,
    ) -> Result<ConsentRecord, AppError> {
        let record = ConsentRecord {
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            consented,
            document_version: self.current_version.clone(),
            timestamp: Utc::now().timestamp_millis(),
            session_id,
        };

        self.db.add_consent(&record).await?;
        tracing::info!(user_id, consented, version = %record.document_version, "Consent recorded");

        Ok(record)
    }

    /// Consent history for a user, most recent first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<ConsentRecord>, AppError> {
        let mut records = self.db.get_consents_for_user(user_id).await?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}
