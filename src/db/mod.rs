// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// Occurrence documents, keyed by occurrence id
    pub const OCCURRENCES: &str = "monthlyData";
    /// Abatement actions recorded against occurrence ids (overlay for
    /// fallback-loaded data)
    pub const OCCURRENCE_STATUS: &str = "occurrence_status";
    /// Append-only LGPD consent history, keyed by `{user_id}_{timestamp}`
    pub const CONSENTS: &str = "lgpd_consents";
    /// Best-effort access/mutation audit trail
    pub const AUDIT_LOGS: &str = "audit_logs";
}
