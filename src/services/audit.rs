// SPDX-License-Identifier: MIT

//! Best-effort audit trail for access to sensitive data (LGPD).
//!
//! Writes never interrupt the primary operation: a failed append is
//! logged and dropped.

use crate::db::FirestoreDb;
use serde::{Deserialize, Serialize};

/// One audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub user_id: String,
    pub user_email: String,
    /// What happened (e.g. "abatement_toggle", "report_generated")
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    /// Epoch millis
    pub timestamp: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AuditLog {
    pub fn new(
        user_id: &str,
        user_email: &str,
        action: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            success: true,
            error_message: None,
            session_id: None,
        }
    }

    pub fn document_id(&self) -> String {
        format!("{}_{}", self.user_id, self.timestamp)
    }
}

/// Appends audit events, swallowing failures.
#[derive(Clone)]
pub struct AuditService {
    db: FirestoreDb,
}

impl AuditService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Record an event. Failures are logged, never propagated.
    pub async fn log(&self, entry: AuditLog) {
        if let Err(e) = self.db.add_audit_log(&entry).await {
            tracing::warn!(
                action = %entry.action,
                resource = %entry.resource_id,
                error = %e,
                "Audit log write failed (dropped)"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_failure_is_swallowed() {
        // Offline mock: every write errors, log() must still return
        let service = AuditService::new(FirestoreDb::new_mock());
        service
            .log(AuditLog::new(
                "uid-1",
                "staff@clube.com.br",
                "abatement_toggle",
                "occurrence",
                "occ_123",
            ))
            .await;
    }
}
