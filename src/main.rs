// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ivoire Tourism API Server
//!
//! Records visitor activity for the Côte d'Ivoire tourism app, rolls it up
//! into daily trends, and serves feature flags to the client.

use ivoire_tourism::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb, Store},
    services::FeatureFlagService,
    AppState,
};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        storage = ?config.storage,
        "Starting Ivoire Tourism API"
    );

    let db: Arc<dyn Store> = match config.storage {
        StorageBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db));

    seed_features(&state, &config.features_seed_path).await;

    // Build router
    let app = ivoire_tourism::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create default feature flags that are not in the store yet.
///
/// A missing or broken seed file is logged and skipped; the server still starts.
async fn seed_features(state: &AppState, path: &str) {
    if !Path::new(path).exists() {
        tracing::info!(path, "No feature seed file, skipping");
        return;
    }

    let flags = match FeatureFlagService::load_seed_file(path) {
        Ok(flags) => flags,
        Err(e) => {
            tracing::error!(path, error = %e, "Failed to read feature seed file");
            return;
        }
    };

    let total = flags.len();
    match state.features.seed(flags).await {
        Ok(created) => tracing::info!(path, total, created, "Feature flags seeded"),
        Err(e) => tracing::error!(path, error = %e, "Failed to seed feature flags"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
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
                .add_directive("ivoire_tourism=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
