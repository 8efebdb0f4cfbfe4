// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user daily activity aggregates.
//!
//! One document per (user, UTC calendar day), incremented as events are
//! aggregated. Dashboards read these instead of scanning the event log.

use crate::models::{ActivityEvent, ActivityKind};
use crate::time_utils::day_key;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored field names, shared by the Firestore queries and increment transforms.
pub mod fields {
    pub const USER_ID: &str = "userId";
    pub const DATE: &str = "date";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const ATTRACTIONS_VISITED: &str = "attractionsVisited";
    pub const AUDIO_GUIDES_LISTENED: &str = "audioGuidesListened";
    pub const REVIEW_COUNT: &str = "reviewCount";
    pub const TOTAL_LISTENING_TIME: &str = "totalListeningTime";
    pub const SHARE_COUNT: &str = "shareCount";
    pub const FAVORITE_COUNT: &str = "favoriteCount";
}

/// Aggregated counters for one user on one day.
///
/// Stored at: `daily_activity/{user_id}_{YYYY-MM-DD}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct DailyActivity {
    pub user_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    #[serde(default)]
    pub attractions_visited: u32,
    #[serde(default)]
    pub audio_guides_listened: u32,
    #[serde(default)]
    pub review_count: u32,
    /// Seconds
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_listening_time: u64,
    #[serde(default)]
    pub share_count: u32,
    #[serde(default)]
    pub favorite_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DailyActivity {
    /// Empty aggregate for a user and day.
    pub fn new(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            attractions_visited: 0,
            audio_guides_listened: 0,
            review_count: 0,
            total_listening_time: 0,
            share_count: 0,
            favorite_count: 0,
            updated_at: None,
        }
    }

    /// Document ID for a (user, day) pair.
    pub fn doc_id(user_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", urlencoding::encode(user_id), date.format("%Y-%m-%d"))
    }

    /// Add a delta to the counters.
    pub fn apply(&mut self, delta: &ActivityDelta) {
        self.attractions_visited = self
            .attractions_visited
            .saturating_add(delta.attractions_visited);
        self.audio_guides_listened = self
            .audio_guides_listened
            .saturating_add(delta.audio_guides_listened);
        self.review_count = self.review_count.saturating_add(delta.review_count);
        self.total_listening_time = self
            .total_listening_time
            .saturating_add(delta.total_listening_time);
        self.share_count = self.share_count.saturating_add(delta.share_count);
        self.favorite_count = self.favorite_count.saturating_add(delta.favorite_count);
    }

    /// Rebuild the aggregate for a user and day from the raw event log.
    ///
    /// Events for other users or other days are skipped.
    pub fn replay<'a, I>(user_id: &str, date: NaiveDate, events: I) -> Self
    where
        I: IntoIterator<Item = &'a ActivityEvent>,
    {
        let mut daily = Self::new(user_id, date);
        for event in events {
            if event.user_id == user_id && day_key(event.timestamp) == date {
                daily.apply(&ActivityDelta::from_kind(&event.kind));
            }
        }
        daily
    }

    /// True when no counter has moved.
    pub fn is_empty(&self) -> bool {
        self.attractions_visited == 0
            && self.audio_guides_listened == 0
            && self.review_count == 0
            && self.total_listening_time == 0
            && self.share_count == 0
            && self.favorite_count == 0
    }
}

/// Counter increments produced by a single event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityDelta {
    pub attractions_visited: u32,
    pub audio_guides_listened: u32,
    pub review_count: u32,
    pub total_listening_time: u64,
    pub share_count: u32,
    pub favorite_count: u32,
}

impl ActivityDelta {
    /// Map an action to its counter increments.
    ///
    /// Tour start/complete events are recorded but not attributed to any counter.
    pub fn from_kind(kind: &ActivityKind) -> Self {
        let mut delta = Self::default();
        match kind {
            ActivityKind::Visit { .. } => delta.attractions_visited = 1,
            ActivityKind::Listen { duration, .. } => {
                delta.audio_guides_listened = 1;
                if let Some(seconds) = duration.filter(|d| d.is_finite() && *d >= 0.0) {
                    delta.total_listening_time = seconds.round() as u64;
                }
            }
            ActivityKind::Review { .. } => delta.review_count = 1,
            ActivityKind::Share { .. } => delta.share_count = 1,
            ActivityKind::Favorite {} => delta.favorite_count = 1,
            ActivityKind::TourStart {} | ActivityKind::TourComplete {} => {}
        }
        delta
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Non-zero increments keyed by stored field name.
    pub fn increments(&self) -> Vec<(&'static str, i64)> {
        [
            (
                fields::ATTRACTIONS_VISITED,
                i64::from(self.attractions_visited),
            ),
            (
                fields::AUDIO_GUIDES_LISTENED,
                i64::from(self.audio_guides_listened),
            ),
            (fields::REVIEW_COUNT, i64::from(self.review_count)),
            (
                fields::TOTAL_LISTENING_TIME,
                i64::try_from(self.total_listening_time).unwrap_or(i64::MAX),
            ),
            (fields::SHARE_COUNT, i64::from(self.share_count)),
            (fields::FAVORITE_COUNT, i64::from(self.favorite_count)),
        ]
        .into_iter()
        .filter(|(_, by)| *by != 0)
        .collect()
    }
}
