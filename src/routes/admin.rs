// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes: feature flag management and dashboard stats.
//!
//! Everything here is a thin call into the services; the admin role check
//! lives in the middleware applied in routes/mod.rs.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{FeatureFlag, FlagPatch, FlagStats, NewFeatureFlag, PlatformActivity};
use crate::routes::{ApiResponse, JsonBody, PathParam, QueryParams};
use crate::services::FlagFilter;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Trailing window for platform activity on the dashboard.
const STATS_WINDOW_DAYS: u32 = 30;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/features", get(list_features).post(create_feature))
        .route(
            "/api/admin/features/{id}",
            get(get_feature).put(update_feature).delete(delete_feature),
        )
        .route("/api/admin/features/{id}/toggle", patch(toggle_feature))
        .route("/api/admin/stats", get(get_stats))
}

// ─── Feature Flags ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminListQuery {
    #[serde(default)]
    enabled_only: bool,
    category: Option<String>,
}

async fn list_features(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): QueryParams<AdminListQuery>,
) -> Result<Json<ApiResponse<Vec<FeatureFlag>>>> {
    let filter = FlagFilter {
        enabled_only: params.enabled_only,
        category: params.category,
    };
    Ok(ApiResponse::ok(state.features.list(&filter).await?))
}

async fn create_feature(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Json(body), _): JsonBody<NewFeatureFlag>,
) -> Result<(StatusCode, Json<ApiResponse<FeatureFlag>>)> {
    let flag = state.features.create(body).await?;
    tracing::info!(admin = %admin.user_id, key = %flag.key, "Admin created feature flag");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(flag, "Feature created"),
    ))
}

async fn get_feature(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): PathParam<String>,
) -> Result<Json<ApiResponse<FeatureFlag>>> {
    let flag = state.features.get(&id).await?.ok_or_else(|| {
        crate::error::AppError::NotFound(format!("Feature '{}' not found", id))
    })?;
    Ok(ApiResponse::ok(flag))
}

async fn update_feature(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Path(id), _): PathParam<String>,
    WithRejection(Json(body), _): JsonBody<FlagPatch>,
) -> Result<Json<ApiResponse<FeatureFlag>>> {
    let flag = state.features.update(&id, body).await?;
    tracing::info!(admin = %admin.user_id, key = %flag.key, "Admin updated feature flag");
    Ok(ApiResponse::ok_with_message(flag, "Feature updated"))
}

async fn toggle_feature(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Path(id), _): PathParam<String>,
) -> Result<Json<ApiResponse<FeatureFlag>>> {
    let flag = state.features.toggle(&id).await?;
    tracing::info!(
        admin = %admin.user_id,
        key = %flag.key,
        enabled = flag.enabled,
        "Admin toggled feature flag"
    );

    let message = if flag.enabled {
        "Feature enabled"
    } else {
        "Feature disabled"
    };
    Ok(ApiResponse::ok_with_message(flag, message))
}

#[derive(Serialize)]
pub struct DeletedFeature {
    pub id: String,
}

async fn delete_feature(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    WithRejection(Path(id), _): PathParam<String>,
) -> Result<Json<ApiResponse<DeletedFeature>>> {
    state.features.delete(&id).await?;
    tracing::info!(admin = %admin.user_id, id = %id, "Admin deleted feature flag");

    Ok(ApiResponse::ok_with_message(
        DeletedFeature {
            id: id.trim().to_lowercase(),
        },
        "Feature deleted",
    ))
}

// ─── Dashboard Stats ─────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct AdminStatsResponse {
    pub features: FlagStats,
    pub activity: PlatformActivity,
    pub generated_at: String,
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AdminStatsResponse>>> {
    let (features, activity) = tokio::try_join!(
        state.features.stats(),
        state.trends.platform_activity(STATS_WINDOW_DAYS),
    )?;

    Ok(ApiResponse::ok(AdminStatsResponse {
        features,
        activity,
        generated_at: format_utc_rfc3339(chrono::Utc::now()),
    }))
}
