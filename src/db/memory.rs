// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.
//!
//! Each DashMap entry is locked for the duration of an update, so daily
//! increments on the same key never lose writes.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{ActivityDelta, ActivityEvent, DailyActivity, FeatureFlag};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryDb {
    /// Events per user, in insertion order
    events: DashMap<String, Vec<ActivityEvent>>,
    daily: DashMap<String, DailyActivity>,
    flags: DashMap<String, FeatureFlag>,
    next_event_id: AtomicU64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn insert_event(&self, event: &ActivityEvent) -> Result<ActivityEvent, AppError> {
        let id = self.next_event_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut stored = event.clone();
        stored.id = Some(format!("evt_{:08}", id));

        self.events
            .entry(stored.user_id.clone())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn recent_events(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ActivityEvent>, AppError> {
        let mut events = self
            .events
            .get(user_id)
            .map(|events| events.clone())
            .unwrap_or_default();

        // Stable sort keeps insertion order for equal timestamps; reverse for newest first.
        events.sort_by_key(|e| e.timestamp);
        events.reverse();
        events.truncate(limit as usize);
        Ok(events)
    }

    async fn increment_daily(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ActivityDelta,
    ) -> Result<DailyActivity, AppError> {
        let mut entry = self
            .daily
            .entry(DailyActivity::doc_id(user_id, date))
            .or_insert_with(|| DailyActivity::new(user_id, date));

        entry.apply(delta);
        entry.updated_at = Some(chrono::Utc::now());
        Ok(entry.clone())
    }

    async fn get_daily(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>, AppError> {
        Ok(self
            .daily
            .get(&DailyActivity::doc_id(user_id, date))
            .map(|d| d.clone()))
    }

    async fn daily_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivity>, AppError> {
        let mut rows: Vec<DailyActivity> = self
            .daily
            .iter()
            .filter(|d| d.user_id == user_id && d.date >= from && d.date <= to)
            .map(|d| d.clone())
            .collect();
        rows.sort_by_key(|d| d.date);
        Ok(rows)
    }

    async fn daily_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivity>, AppError> {
        Ok(self
            .daily
            .iter()
            .filter(|d| d.date >= from && d.date <= to)
            .map(|d| d.clone())
            .collect())
    }

    async fn get_flag(&self, id: &str) -> Result<Option<FeatureFlag>, AppError> {
        Ok(self.flags.get(id).map(|f| f.clone()))
    }

    async fn list_flags(&self) -> Result<Vec<FeatureFlag>, AppError> {
        Ok(self.flags.iter().map(|f| f.clone()).collect())
    }

    async fn insert_flag(&self, flag: &FeatureFlag) -> Result<(), AppError> {
        match self.flags.entry(flag.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Feature '{}' already exists",
                flag.key
            ))),
            Entry::Vacant(slot) => {
                slot.insert(flag.clone());
                Ok(())
            }
        }
    }

    async fn put_flag(&self, flag: &FeatureFlag) -> Result<(), AppError> {
        self.flags.insert(flag.id.clone(), flag.clone());
        Ok(())
    }

    async fn delete_flag(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.flags.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let db = Arc::new(MemoryDb::new());
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let delta = ActivityDelta {
            audio_guides_listened: 1,
            total_listening_time: 10,
            ..Default::default()
        };

        let mut handles = vec![];
        for _ in 0..50 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.increment_daily("u1", date, &delta).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let daily = db.get_daily("u1", date).await.unwrap().unwrap();
        assert_eq!(daily.audio_guides_listened, 50);
        assert_eq!(daily.total_listening_time, 500);
    }
}
