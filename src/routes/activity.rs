// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity routes for signed-in users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityEvent, DailyActivity, EventRefs, TrendSummary};
use crate::routes::{ApiResponse, JsonBody, QueryParams};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Activity routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activity", post(record_activity))
        .route("/api/activity/trends", get(get_trends))
        .route("/api/activity/events", get(get_recent_events))
}

// ─── Recording ───────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RecordActivityRequest {
    #[serde(default)]
    #[validate(length(max = 32))]
    action: String,
    #[serde(flatten)]
    refs: EventRefs,
    metadata: Option<serde_json::Value>,
    /// RFC3339; defaults to now
    timestamp: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct RecordActivityResponse {
    pub event: ActivityEvent,
    pub daily: DailyActivity,
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    raw.map(|raw| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|_| {
                AppError::Validation(
                    "Invalid 'timestamp': must be RFC3339 datetime".to_string(),
                )
            })
    })
    .transpose()
}

/// Record an event for the current user, then fold it into today's aggregate.
///
/// The two writes are independent. If aggregation fails the event stays in
/// the log and the error is returned.
async fn record_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(body), _): JsonBody<RecordActivityRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecordActivityResponse>>)> {
    body.validate()?;
    let timestamp = parse_timestamp(body.timestamp.as_deref())?;

    let event = state
        .recorder
        .record(&user.user_id, &body.action, body.refs, body.metadata, timestamp)
        .await?;

    let daily = state.aggregator.apply_event(&event).await.inspect_err(|e| {
        tracing::warn!(
            user_id = %user.user_id,
            event_id = ?event.id,
            error = %e,
            "Event recorded but not aggregated"
        );
    })?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(RecordActivityResponse { event, daily }),
    ))
}

// ─── Trends ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct TrendsQuery {
    #[serde(default = "default_days")]
    days: u32,
}

fn default_days() -> u32 {
    7
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct TrendsResponse {
    pub window_days: u32,
    /// Days with activity only, oldest first
    pub days: Vec<DailyActivity>,
    pub summary: TrendSummary,
}

/// Trailing 7- or 30-day trend for the current user.
async fn get_trends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(params), _): QueryParams<TrendsQuery>,
) -> Result<Json<ApiResponse<TrendsResponse>>> {
    let days = state.trends.trend(&user.user_id, params.days).await?;
    let summary = TrendSummary::from_days(params.days, &days);

    Ok(ApiResponse::ok(TrendsResponse {
        window_days: params.days,
        days,
        summary,
    }))
}

// ─── Event History ───────────────────────────────────────────

#[derive(Deserialize)]
struct EventsQuery {
    limit: Option<u32>,
}

/// Latest events for the current user, newest first.
async fn get_recent_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(params), _): QueryParams<EventsQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityEvent>>>> {
    let events = state.recorder.recent(&user.user_id, params.limit).await?;
    Ok(ApiResponse::ok(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(Some("2024-06-01T10:00:00+02:00"))
            .unwrap()
            .unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-06-01T08:00:00+00:00");
        assert!(parse_timestamp(None).unwrap().is_none());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp(Some("yesterday")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
