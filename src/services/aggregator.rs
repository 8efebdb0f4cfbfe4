// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily activity aggregation.
//!
//! Folds one event into its (user, UTC day) aggregate using the store's
//! atomic increment. Applying the same event twice counts it twice; there is
//! no per-event idempotency key yet.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{ActivityDelta, ActivityEvent, DailyActivity};
use crate::time_utils::day_key;
use std::sync::Arc;

#[derive(Clone)]
pub struct DailyAggregator {
    db: Arc<dyn Store>,
}

impl DailyAggregator {
    pub fn new(db: Arc<dyn Store>) -> Self {
        Self { db }
    }

    /// Apply an event to its daily aggregate and return the aggregate.
    ///
    /// Events that map to no counter (tour start/complete) write nothing and
    /// return the day's current aggregate, or an unsaved empty one.
    pub async fn apply_event(&self, event: &ActivityEvent) -> Result<DailyActivity> {
        if event.user_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Event is missing userId".to_string(),
            ));
        }

        let date = day_key(event.timestamp);
        let delta = ActivityDelta::from_kind(&event.kind);

        if delta.is_empty() {
            tracing::debug!(
                user_id = %event.user_id,
                action = event.kind.action(),
                %date,
                "Event not attributed to a daily counter"
            );
            return Ok(self
                .db
                .get_daily(&event.user_id, date)
                .await?
                .unwrap_or_else(|| DailyActivity::new(&event.user_id, date)));
        }

        let daily = self.db.increment_daily(&event.user_id, date, &delta).await?;

        tracing::debug!(
            user_id = %event.user_id,
            action = event.kind.action(),
            %date,
            "Daily aggregate updated"
        );

        Ok(daily)
    }
}
