// SPDX-License-Identifier: MIT

//! FlexFit API Server
//!
//! Backend for the FlexFit AI fitness application: reconciles identity
//! provider state with stored user profiles and subscription tiers.

use flexfit_api::{
    config::Config,
    db::{FirestoreDb, ProfileStore},
    services::{GcipClient, IdTokenVerifier, IdentityProvider},
    session::SessionRegistry,
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
    tracing::info!(port = config.port, "Starting FlexFit API");

    // Initialize Firestore database
    let store: Arc<dyn ProfileStore> = Arc::new(
        FirestoreDb::new(&config.gcp_project_id)
            .await
            .expect("Failed to connect to Firestore"),
    );

    // Identity provider: None when misconfigured. Operations then
    // short-circuit to provider_unavailable instead of failing repeatedly.
    let provider: Option<Arc<dyn IdentityProvider>> = config
        .identity_api_key
        .clone()
        .map(|key| Arc::new(GcipClient::new(key)) as Arc<dyn IdentityProvider>);

    if provider.is_some() {
        tracing::info!("Identity provider initialized");
    }

    // ID token verifier for authenticated routes
    let verifier = Arc::new(
        IdTokenVerifier::new(&config.gcp_project_id).expect("Failed to initialize token verifier"),
    );

    // Session registry (one reconciler per signed-in identity)
    let sessions = SessionRegistry::new(provider, store.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        verifier,
        sessions,
    });

    // Build router
    let app = flexfit_api::routes::create_router(state);

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
                .add_directive("flexfit_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
