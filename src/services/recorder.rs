// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity recording service.
//!
//! Appends one immutable event per call. Aggregation is a separate step
//! (see [`crate::services::DailyAggregator`]); duplicates are recorded as-is.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{ActivityEvent, ActivityKind, EventRefs};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub const DEFAULT_RECENT_LIMIT: u32 = 20;
pub const MAX_RECENT_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct ActivityRecorder {
    db: Arc<dyn Store>,
}

impl ActivityRecorder {
    pub fn new(db: Arc<dyn Store>) -> Self {
        Self { db }
    }

    /// Record an event for `user_id`.
    ///
    /// `timestamp` defaults to now. An unknown action or mistyped metadata is
    /// a validation error and nothing is written.
    pub async fn record(
        &self,
        user_id: &str,
        action: &str,
        refs: EventRefs,
        metadata: Option<serde_json::Value>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<ActivityEvent> {
        if user_id.trim().is_empty() {
            return Err(AppError::Validation("userId is required".to_string()));
        }

        let kind = ActivityKind::parse(action, metadata)?;
        let event = ActivityEvent {
            id: None,
            user_id: user_id.to_string(),
            kind,
            refs,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };

        let stored = self.db.insert_event(&event).await?;

        tracing::debug!(
            user_id,
            action,
            event_id = ?stored.id,
            "Activity event recorded"
        );

        Ok(stored)
    }

    /// A user's latest events, newest first. `limit` is clamped to 1..=100.
    pub async fn recent(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<ActivityEvent>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        self.db.recent_events(user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use serde_json::json;

    fn recorder() -> ActivityRecorder {
        ActivityRecorder::new(Arc::new(MemoryDb::new()))
    }

    #[tokio::test]
    async fn test_record_assigns_id_and_default_timestamp() {
        let recorder = recorder();
        let before = Utc::now();

        let event = recorder
            .record("u1", "visit", EventRefs::default(), None, None)
            .await
            .unwrap();

        assert!(event.id.is_some());
        assert!(event.timestamp >= before);
        assert_eq!(event.kind.action(), "visit");
    }

    #[tokio::test]
    async fn test_record_rejects_invalid_action_without_writing() {
        let recorder = recorder();

        let err = recorder
            .record("u1", "teleport", EventRefs::default(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(recorder.recent("u1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_rejects_missing_user() {
        let err = recorder()
            .record(" ", "visit", EventRefs::default(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicates_are_recorded_separately() {
        let recorder = recorder();
        let ts: DateTime<Utc> = "2024-06-01T10:00:00Z".parse().unwrap();

        for _ in 0..2 {
            recorder
                .record(
                    "u1",
                    "listen",
                    EventRefs::default(),
                    Some(json!({"duration": 30})),
                    Some(ts),
                )
                .await
                .unwrap();
        }

        let events = recorder.recent("u1", Some(10)).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_ne!(events[0].id, events[1].id);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_clamped() {
        let recorder = recorder();
        for hour in 0..3 {
            let ts = format!("2024-06-01T0{}:00:00Z", hour).parse().unwrap();
            recorder
                .record("u1", "share", EventRefs::default(), None, Some(ts))
                .await
                .unwrap();
        }

        let events = recorder.recent("u1", Some(0)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].timestamp,
            "2024-06-01T02:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }
}
