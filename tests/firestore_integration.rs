// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). Each test uses its own user or key so
//! runs against a shared emulator do not collide.

use chrono::{NaiveDate, TimeZone, Utc};
use ivoire_tourism::db::Store;
use ivoire_tourism::models::{
    ActivityDelta, ActivityEvent, ActivityKind, EventRefs, FeatureFlag, FlagMetadata,
};
use ivoire_tourism::services::DailyAggregator;
use std::sync::Arc;

mod common;
use common::test_db;

/// Unique suffix for test isolation.
fn unique_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}

fn listen(user_id: &str, duration: Option<f64>, day: u32) -> ActivityEvent {
    ActivityEvent {
        id: None,
        user_id: user_id.to_string(),
        kind: ActivityKind::Listen {
            duration,
            language: Some("fr".to_string()),
        },
        refs: EventRefs {
            audio_guide_id: Some("guide-plateau".to_string()),
            ..Default::default()
        },
        timestamp: Utc.with_ymd_and_hms(2024, 6, day, 9, 30, 0).unwrap(),
    }
}

fn test_flag(key: &str) -> FeatureFlag {
    let now = Utc::now();
    FeatureFlag {
        id: key.to_string(),
        key: key.to_string(),
        name: "Emulator flag".to_string(),
        description: String::new(),
        category: "test".to_string(),
        enabled: false,
        metadata: FlagMetadata::default(),
        required_version: None,
        created_at: now,
        updated_at: now,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIVITY TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_event_roundtrip_and_history() {
    require_emulator!();

    let db = test_db().await;
    let user = format!("user-{}", unique_id());

    let first = db.insert_event(&listen(&user, Some(30.0), 1)).await.unwrap();
    let second = db.insert_event(&listen(&user, None, 2)).await.unwrap();
    assert!(first.id.is_some());
    assert_ne!(first.id, second.id);

    let recent = db.recent_events(&user, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, second.id, "newest first");
    assert_eq!(recent[1].kind, first.kind);
    assert_eq!(recent[1].refs.audio_guide_id.as_deref(), Some("guide-plateau"));
}

#[tokio::test]
async fn test_listens_aggregate_into_one_row() {
    require_emulator!();

    let db: Arc<dyn Store> = Arc::new(test_db().await);
    let aggregator = DailyAggregator::new(db.clone());
    let user = format!("user-{}", unique_id());

    for duration in [Some(30.0), Some(45.0), None] {
        let event = db.insert_event(&listen(&user, duration, 15)).await.unwrap();
        aggregator.apply_event(&event).await.unwrap();
    }

    let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let row = db.get_daily(&user, date).await.unwrap().unwrap();
    assert_eq!(row.audio_guides_listened, 3);
    assert_eq!(row.total_listening_time, 75);
    assert_eq!(row.attractions_visited, 0);
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let user = format!("user-{}", unique_id());
    let date = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
    let delta = ActivityDelta {
        attractions_visited: 1,
        ..Default::default()
    };

    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = db.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            db.increment_daily(&user, date, &delta).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let row = db.get_daily(&user, date).await.unwrap().unwrap();
    assert_eq!(row.attractions_visited, 10);
}

#[tokio::test]
async fn test_daily_range_query() {
    require_emulator!();

    let db = test_db().await;
    let user = format!("user-{}", unique_id());
    let delta = ActivityDelta {
        share_count: 1,
        ..Default::default()
    };

    for day in [1, 5, 9] {
        let date = NaiveDate::from_ymd_opt(2024, 7, day).unwrap();
        db.increment_daily(&user, date, &delta).await.unwrap();
    }

    let rows = db
        .daily_for_user(
            &user,
            NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 9).unwrap(),
        )
        .await
        .unwrap();

    let days: Vec<u32> = rows.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
    assert_eq!(days, vec![5, 9]);
}

// ═══════════════════════════════════════════════════════════════════════════
// FEATURE FLAG TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_flag_insert_conflict_and_delete() {
    require_emulator!();

    let db = test_db().await;
    let key = format!("flag_{}", unique_id());
    let flag = test_flag(&key);

    db.insert_flag(&flag).await.unwrap();
    let err = db.insert_flag(&flag).await.unwrap_err();
    assert!(matches!(err, ivoire_tourism::error::AppError::Conflict(_)));

    let mut updated = db.get_flag(&key).await.unwrap().unwrap();
    assert_eq!(updated.key, key);
    updated.enabled = true;
    db.put_flag(&updated).await.unwrap();
    assert!(db.get_flag(&key).await.unwrap().unwrap().enabled);

    assert!(db.delete_flag(&key).await.unwrap());
    assert!(!db.delete_flag(&key).await.unwrap());
    assert!(db.get_flag(&key).await.unwrap().is_none());
}
