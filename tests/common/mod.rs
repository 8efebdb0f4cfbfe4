// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use ivoire_tourism::config::Config;
use ivoire_tourism::db::{FirestoreDb, MemoryDb};
use ivoire_tourism::middleware::auth::create_jwt;
use ivoire_tourism::routes::create_router;
use ivoire_tourism::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let state = Arc::new(AppState::new(config, Arc::new(MemoryDb::new())));
    (create_router(state.clone()), state)
}

/// Create a test app whose store is offline; every database call fails.
#[allow(dead_code)]
pub fn create_offline_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let state = Arc::new(AppState::new(config, Arc::new(FirestoreDb::new_mock())));
    (create_router(state.clone()), state)
}

/// Session token for a regular user.
#[allow(dead_code)]
pub fn user_token(state: &AppState, user_id: &str) -> String {
    create_jwt(user_id, None, &state.config.jwt_signing_key).unwrap()
}

/// Session token carrying the admin role.
#[allow(dead_code)]
pub fn admin_token(state: &AppState) -> String {
    create_jwt("admin-1", Some("admin"), &state.config.jwt_signing_key).unwrap()
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
