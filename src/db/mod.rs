// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Store`] is the document-store contract the services are written against.
//! [`FirestoreDb`] backs production; [`MemoryDb`] backs local development and
//! tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{ActivityDelta, ActivityEvent, DailyActivity, FeatureFlag};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Collection names as constants.
pub mod collections {
    /// Append-only activity log
    pub const ACTIVITY_EVENTS: &str = "activity_events";
    /// Daily aggregates (keyed by `{user_id}_{date}`)
    pub const DAILY_ACTIVITY: &str = "daily_activity";
    /// Feature flags (keyed by normalized flag key)
    pub const FEATURE_FLAGS: &str = "feature_flags";
}

/// Document store operations.
///
/// Every write touches a single document atomically; nothing here spans
/// documents transactionally.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Activity Events ─────────────────────────────────────────

    /// Append an event. Returns the stored event with its assigned ID.
    async fn insert_event(&self, event: &ActivityEvent) -> Result<ActivityEvent, AppError>;

    /// Latest events for a user, newest first.
    async fn recent_events(&self, user_id: &str, limit: u32)
        -> Result<Vec<ActivityEvent>, AppError>;

    // ─── Daily Aggregates ────────────────────────────────────────

    /// Atomically add `delta` to the (user, date) aggregate, creating it if
    /// missing. Returns the aggregate after the write.
    async fn increment_daily(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ActivityDelta,
    ) -> Result<DailyActivity, AppError>;

    async fn get_daily(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>, AppError>;

    /// A user's aggregates with `from <= date <= to`, ascending by date.
    async fn daily_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivity>, AppError>;

    /// All users' aggregates with `from <= date <= to`.
    async fn daily_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivity>, AppError>;

    // ─── Feature Flags ───────────────────────────────────────────

    async fn get_flag(&self, id: &str) -> Result<Option<FeatureFlag>, AppError>;

    async fn list_flags(&self) -> Result<Vec<FeatureFlag>, AppError>;

    /// Create a flag. Fails with [`AppError::Conflict`] if the ID exists.
    async fn insert_flag(&self, flag: &FeatureFlag) -> Result<(), AppError>;

    /// Overwrite an existing flag document.
    async fn put_flag(&self, flag: &FeatureFlag) -> Result<(), AppError>;

    /// Delete a flag. Returns `false` if it did not exist.
    async fn delete_flag(&self, id: &str) -> Result<bool, AppError>;
}
