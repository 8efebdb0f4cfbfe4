// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public feature flag API tests.

use axum::http::StatusCode;
use ivoire_tourism::models::{FlagMetadata, NewFeatureFlag};
use ivoire_tourism::AppState;
use tower::ServiceExt;

mod common;
use common::{create_offline_app, create_test_app, json_body, request};

fn new_flag(key: &str, enabled: bool, priority: i32) -> NewFeatureFlag {
    NewFeatureFlag {
        key: key.to_string(),
        name: key.replace('_', " "),
        description: String::new(),
        category: "ui".to_string(),
        enabled,
        metadata: FlagMetadata {
            priority,
            rollout_percentage: None,
        },
        required_version: None,
    }
}

async fn seed(state: &AppState, flags: Vec<NewFeatureFlag>) {
    state.features.seed(flags).await.unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_public_list_only_has_enabled_flags_by_priority() {
    let (app, state) = create_test_app();
    seed(
        &state,
        vec![
            new_flag("dark_mode", false, 10),
            new_flag("offline_maps", true, 40),
            new_flag("audio_guides", true, 50),
        ],
    )
    .await;

    let response = app
        .oneshot(request("GET", "/api/features", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let keys: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["audio_guides", "offline_maps"]);
}

#[tokio::test]
async fn test_get_feature_is_case_insensitive() {
    let (app, state) = create_test_app();
    seed(&state, vec![new_flag("dark_mode", true, 0)]).await;

    let response = app
        .oneshot(request("GET", "/api/features/DARK_MODE", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["key"], "dark_mode");
    assert_eq!(body["data"]["id"], "dark_mode");
    assert_eq!(body["data"]["enabled"], true);
}

#[tokio::test]
async fn test_unknown_feature_is_not_found() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(request("GET", "/api/features/no_such_flag", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not_found");
    assert!(body["message"].as_str().unwrap().contains("no_such_flag"));
}

#[tokio::test]
async fn test_check_unknown_feature_is_off() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(request("GET", "/api/features/check/ar_view", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["key"], "ar_view");
    assert_eq!(body["data"]["enabled"], false);
}

#[tokio::test]
async fn test_check_respects_required_version() {
    let (app, state) = create_test_app();
    let mut flag = new_flag("offline_maps", true, 0);
    flag.required_version = Some("1.4.0".to_string());
    seed(&state, vec![flag]).await;

    let old = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/features/check/offline_maps?version=1.3.9",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(old).await["data"]["enabled"], false);

    let new = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/features/check/offline_maps?version=1.10.0",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(new).await["data"]["enabled"], true);

    // No version supplied: the requirement is not applied
    let unknown = app
        .oneshot(request("GET", "/api/features/check/offline_maps", None, None))
        .await
        .unwrap();
    assert_eq!(json_body(unknown).await["data"]["enabled"], true);
}

#[tokio::test]
async fn test_check_rollout_is_stable_per_user() {
    let (app, state) = create_test_app();
    let mut flag = new_flag("ar_view", true, 0);
    flag.metadata.rollout_percentage = Some(50);
    seed(&state, vec![flag]).await;

    let mut first = Vec::new();
    for user in ["u1", "u2", "u3", "u4"] {
        let uri = format!("/api/features/check/ar_view?userId={}", user);
        let response = app
            .clone()
            .oneshot(request("GET", &uri, None, None))
            .await
            .unwrap();
        first.push(json_body(response).await["data"]["enabled"].clone());
    }

    for (i, user) in ["u1", "u2", "u3", "u4"].into_iter().enumerate() {
        let uri = format!("/api/features/check/ar_view?userId={}", user);
        let response = app
            .clone()
            .oneshot(request("GET", &uri, None, None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["data"]["enabled"], first[i]);
    }
}

#[tokio::test]
async fn test_store_failure_is_server_error() {
    let (app, _) = create_offline_app();

    let response = app
        .oneshot(request("GET", "/api/features/check/dark_mode", None, None))
        .await
        .unwrap();

    // A failing store is not the same as a missing flag
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "database_error");
}

#[tokio::test]
async fn test_key_with_slash_is_not_found() {
    // Offline store: only a key that never reaches Firestore can produce 404
    let (app, _) = create_offline_app();

    let response = app
        .oneshot(request("GET", "/api/features/a%2Fb", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_seed_file_parses() {
    let flags =
        ivoire_tourism::services::FeatureFlagService::load_seed_file("data/default_features.json")
            .unwrap();
    assert!(flags.iter().any(|f| f.key == "dark_mode"));

    let (_, state) = create_test_app();
    let total = flags.len();
    assert_eq!(state.features.seed(flags.clone()).await.unwrap(), total);
    // Second run creates nothing
    assert_eq!(state.features.seed(flags).await.unwrap(), 0);
}
