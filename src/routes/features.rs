// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public feature flag routes used by the client for gating.

use crate::error::{AppError, Result};
use crate::models::FeatureFlag;
use crate::routes::{ApiResponse, PathParam, QueryParams};
use crate::services::{FlagContext, FlagFilter};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/features", get(list_enabled))
        .route("/api/features/check/{key}", get(check_feature))
        .route("/api/features/{key}", get(get_feature))
}

#[derive(Deserialize)]
struct ListQuery {
    category: Option<String>,
}

/// Enabled flags, highest priority first.
async fn list_enabled(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): QueryParams<ListQuery>,
) -> Result<Json<ApiResponse<Vec<FeatureFlag>>>> {
    let filter = FlagFilter {
        enabled_only: true,
        category: params.category,
    };
    let flags = state.features.list(&filter).await?;
    Ok(ApiResponse::ok(flags))
}

/// One flag by key (case-insensitive).
async fn get_feature(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(key), _): PathParam<String>,
) -> Result<Json<ApiResponse<FeatureFlag>>> {
    let flag = state
        .features
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feature '{}' not found", key)))?;
    Ok(ApiResponse::ok(flag))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckQuery {
    user_id: Option<String>,
    version: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct FeatureCheck {
    pub key: String,
    pub enabled: bool,
}

/// Whether a flag is on for the calling client. Unknown keys are off.
async fn check_feature(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(key), _): PathParam<String>,
    WithRejection(Query(params), _): QueryParams<CheckQuery>,
) -> Result<Json<ApiResponse<FeatureCheck>>> {
    let ctx = FlagContext {
        user_id: params.user_id,
        client_version: params.version,
    };
    let enabled = state.features.is_enabled_for(&key, &ctx).await?;

    Ok(ApiResponse::ok(FeatureCheck {
        key: key.trim().to_lowercase(),
        enabled,
    }))
}
