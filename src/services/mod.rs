// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod audit;
pub mod consent;
pub mod firebase_auth;
pub mod occurrences;
pub mod rate_limit;
pub mod report;
pub mod reset;

pub use audit::{AuditLog, AuditService};
pub use consent::ConsentService;
pub use firebase_auth::FirebaseAuthClient;
pub use occurrences::OccurrenceService;
pub use rate_limit::RateLimiter;
pub use reset::{InMemoryTokenStore, ResetService, TokenStore};
