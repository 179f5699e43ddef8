// SPDX-License-Identifier: MIT

//! Occurrence-Tracker API Server
//!
//! Backend for the athlete occurrence dashboard: occurrence data access
//! with local fallback, staff password resets, LGPD consent gating, and
//! per-athlete reports.

use occurrence_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{
        reset::start_sweeper, AuditService, ConsentService, FirebaseAuthClient,
        InMemoryTokenStore, OccurrenceService, RateLimiter, ResetService,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Occurrence-Tracker API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Identity provider client; without an API key account checks fall
    // back to the configured allow-list
    let auth = FirebaseAuthClient::new(config.firebase_auth_url.clone(), config.firebase_api_key.clone());
    if auth.is_configured() {
        tracing::info!("Identity provider configured");
    } else {
        tracing::warn!(
            accounts = config.known_accounts.len(),
            "No identity provider key; using account allow-list"
        );
    }

    // Reset token store and its periodic expiry sweep
    let token_store: Arc<dyn occurrence_tracker::services::TokenStore> =
        Arc::new(InMemoryTokenStore::new());
    let _sweeper = start_sweeper(
        token_store.clone(),
        std::time::Duration::from_secs(config.sweep_interval_secs),
    );

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

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        reset_service,
        rate_limiter,
        occurrence_service,
        consent_service,
        audit_service,
    });

    // Build router
    let app = occurrence_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("occurrence_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
