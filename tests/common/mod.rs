// SPDX-License-Identifier: MIT

use occurrence_tracker::config::Config;
use occurrence_tracker::db::FirestoreDb;
use occurrence_tracker::middleware::auth::create_jwt;
use occurrence_tracker::routes::create_router;
use occurrence_tracker::services::{
    AuditService, ConsentService, FirebaseAuthClient, InMemoryTokenStore, OccurrenceService,
    RateLimiter, ResetService, TokenStore,
};
use occurrence_tracker::AppState;
use std::sync::Arc;

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();

    // No API key: account checks use the allow-list from test_default()
    let auth = FirebaseAuthClient::new(config.firebase_auth_url.clone(), None);
    let token_store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
    let reset_service = ResetService::new(
        token_store,
        auth,
        config.known_accounts.clone(),
        config.frontend_url.clone(),
        config.token_ttl_secs,
    );

    let rate_limiter = RateLimiter::new(config.rate_limit_window_secs, config.rate_limit_max);
    let occurrence_service = OccurrenceService::new(db.clone(), config.data_dir.clone());
    let consent_service = ConsentService::new(db.clone(), config.consent_document_version.clone());
    let audit_service = AuditService::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        reset_service,
        rate_limiter,
        occurrence_service,
        consent_service,
        audit_service,
    });

    (create_router(state.clone()), state)
}

/// Create a signed session JWT for tests.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, email: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, email, signing_key).expect("Failed to create test JWT")
}
