// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trend reporting over trailing windows of daily aggregates.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{DailyActivity, PlatformActivity};
use crate::time_utils::window_start;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Window sizes dashboards may ask for.
pub const SUPPORTED_WINDOWS: [u32; 2] = [7, 30];

#[derive(Clone)]
pub struct TrendReporter {
    db: Arc<dyn Store>,
}

impl TrendReporter {
    pub fn new(db: Arc<dyn Store>) -> Self {
        Self { db }
    }

    /// Daily aggregates for the trailing `window_days` ending today (UTC).
    pub async fn trend(&self, user_id: &str, window_days: u32) -> Result<Vec<DailyActivity>> {
        self.trend_as_of(user_id, window_days, Utc::now().date_naive())
            .await
    }

    /// Daily aggregates with `today - window_days + 1 <= date <= today`,
    /// oldest first.
    ///
    /// The result is sparse: days without activity have no row and are not
    /// filled in here.
    pub async fn trend_as_of(
        &self,
        user_id: &str,
        window_days: u32,
        today: NaiveDate,
    ) -> Result<Vec<DailyActivity>> {
        if !SUPPORTED_WINDOWS.contains(&window_days) {
            return Err(AppError::Validation(format!(
                "Unsupported window of {} days: use 7 or 30",
                window_days
            )));
        }

        let from = window_start(today, window_days);
        let mut days = self.db.daily_for_user(user_id, from, today).await?;

        // The store already orders by date; keep the contract independent of it.
        days.retain(|d| d.date >= from && d.date <= today && !d.is_empty());
        days.sort_by_key(|d| d.date);

        tracing::debug!(
            user_id,
            window_days,
            %from,
            %today,
            rows = days.len(),
            "Trend computed"
        );

        Ok(days)
    }

    /// Activity across all users for the trailing window ending today (UTC).
    pub async fn platform_activity(&self, window_days: u32) -> Result<PlatformActivity> {
        let today = Utc::now().date_naive();
        let from = window_start(today, window_days);
        let days = self.db.daily_between(from, today).await?;
        Ok(PlatformActivity::from_days(window_days, &days))
    }
}
