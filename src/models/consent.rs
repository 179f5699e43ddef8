// SPDX-License-Identifier: MIT

//! LGPD consent records.
//!
//! History is append-only: revocation is a new record with
//! `consented = false`, never a mutation of a prior record.

use serde::{Deserialize, Serialize};

/// Immutable, versioned proof that a user accepted (or declined) the
/// data-handling policy. Stored keyed by `{user_id}_{timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub user_id: String,
    pub user_email: String,
    pub consented: bool,
    /// Policy document version the choice was made against
    pub document_version: String,
    /// Epoch millis
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ConsentRecord {
    /// Composite document id, unique per (user, instant).
    pub fn document_id(&self) -> String {
        format!("{}_{}", self.user_id, self.timestamp)
    }
}

/// Decide whether the consent gate should block a user, given their full
/// consent history.
///
/// Consent is needed when there is no record, the latest record is a
/// denial, or the latest grant targets an older policy version.
pub fn needs_consent(records: &[ConsentRecord], current_version: &str) -> bool {
    let latest = records.iter().max_by_key(|r| r.timestamp);

    match latest {
        None => true,
        Some(r) => !r.consented || r.document_version != current_version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(consented: bool, version: &str, timestamp: i64) -> ConsentRecord {
        ConsentRecord {
            user_id: "uid-1".to_string(),
            user_email: "staff@clube.com.br".to_string(),
            consented,
            document_version: version.to_string(),
            timestamp,
            session_id: None,
        }
    }

    #[test]
    fn test_no_record_needs_consent() {
        assert!(needs_consent(&[], "1.0"));
    }

    #[test]
    fn test_grant_at_current_version_passes() {
        let records = vec![record(true, "1.0", 100)];
        assert!(!needs_consent(&records, "1.0"));
    }

    #[test]
    fn test_version_bump_requires_new_consent() {
        let records = vec![record(true, "1.0", 100)];
        assert!(needs_consent(&records, "2.0"));
    }

    #[test]
    fn test_latest_denial_blocks() {
        let records = vec![record(true, "1.0", 100), record(false, "1.0", 200)];
        assert!(needs_consent(&records, "1.0"));
    }

    #[test]
    fn test_regrant_after_denial_passes() {
        // A denial does not permanently block; a later grant re-opens access
        let records = vec![record(false, "1.0", 100), record(true, "1.0", 200)];
        assert!(!needs_consent(&records, "1.0"));
    }

    #[test]
    fn test_document_id_is_composite() {
        assert_eq!(record(true, "1.0", 42).document_id(), "uid-1_42");
    }
}
