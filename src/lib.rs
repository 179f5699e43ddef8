// SPDX-License-Identifier: MIT

//! Occurrence-Tracker: backend API for the athlete occurrence dashboard.
//!
//! Serves disciplinary/behavioral occurrence data for housed youth
//! athletes, staff password resets, and the LGPD consent gate in front of
//! the personal data.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AuditService, ConsentService, OccurrenceService, RateLimiter, ResetService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub reset_service: ResetService,
    pub rate_limiter: RateLimiter,
    pub occurrence_service: OccurrenceService,
    pub consent_service: ConsentService,
    pub audit_service: AuditService,
}
