//! Summary statistics for dashboards.
//!
//! Computed on read from `DailyActivity` rows and the flag collection; none
//! of these are stored.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::models::{DailyActivity, FeatureFlag};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Totals over a trailing window for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct TrendSummary {
    pub window_days: u32,
    /// Days with at least one aggregated event
    pub active_days: u32,
    pub attractions_visited: u32,
    pub audio_guides_listened: u32,
    pub review_count: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_listening_time: u64,
    pub share_count: u32,
    pub favorite_count: u32,
    /// Seconds of listening per active day (0 with no active days)
    pub average_listening_time: f64,
}

impl TrendSummary {
    /// Sum a window of daily rows.
    pub fn from_days(window_days: u32, days: &[DailyActivity]) -> Self {
        let mut summary = Self {
            window_days,
            ..Default::default()
        };

        for day in days.iter().filter(|d| !d.is_empty()) {
            summary.active_days = summary.active_days.saturating_add(1);
            summary.attractions_visited = summary
                .attractions_visited
                .saturating_add(day.attractions_visited);
            summary.audio_guides_listened = summary
                .audio_guides_listened
                .saturating_add(day.audio_guides_listened);
            summary.review_count = summary.review_count.saturating_add(day.review_count);
            summary.total_listening_time = summary
                .total_listening_time
                .saturating_add(day.total_listening_time);
            summary.share_count = summary.share_count.saturating_add(day.share_count);
            summary.favorite_count = summary.favorite_count.saturating_add(day.favorite_count);
        }

        if summary.active_days > 0 {
            summary.average_listening_time =
                summary.total_listening_time as f64 / f64::from(summary.active_days);
        }

        summary
    }
}

/// Flag counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct FlagStats {
    pub total: u32,
    pub enabled: u32,
    pub disabled: u32,
    /// Flag count per category, sorted by category name
    pub by_category: BTreeMap<String, u32>,
}

impl FlagStats {
    pub fn from_flags(flags: &[FeatureFlag]) -> Self {
        let mut stats = Self::default();
        for flag in flags {
            stats.total += 1;
            if flag.enabled {
                stats.enabled += 1;
            } else {
                stats.disabled += 1;
            }
            *stats.by_category.entry(flag.category.clone()).or_insert(0) += 1;
        }
        stats
    }
}

/// Platform-wide activity over a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct PlatformActivity {
    pub window_days: u32,
    pub active_users: u32,
    pub attractions_visited: u32,
    pub audio_guides_listened: u32,
    pub review_count: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_listening_time: u64,
    pub share_count: u32,
    pub favorite_count: u32,
}

impl PlatformActivity {
    pub fn from_days(window_days: u32, days: &[DailyActivity]) -> Self {
        let mut users = HashSet::new();
        let mut activity = Self {
            window_days,
            ..Default::default()
        };

        for day in days.iter().filter(|d| !d.is_empty()) {
            users.insert(day.user_id.as_str());
            activity.attractions_visited = activity
                .attractions_visited
                .saturating_add(day.attractions_visited);
            activity.audio_guides_listened = activity
                .audio_guides_listened
                .saturating_add(day.audio_guides_listened);
            activity.review_count = activity.review_count.saturating_add(day.review_count);
            activity.total_listening_time = activity
                .total_listening_time
                .saturating_add(day.total_listening_time);
            activity.share_count = activity.share_count.saturating_add(day.share_count);
            activity.favorite_count = activity.favorite_count.saturating_add(day.favorite_count);
        }

        activity.active_users = users.len() as u32;
        activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(user: &str, d: u32, visits: u32, listened: u32, seconds: u64) -> DailyActivity {
        let mut row = DailyActivity::new(user, NaiveDate::from_ymd_opt(2024, 6, d).unwrap());
        row.attractions_visited = visits;
        row.audio_guides_listened = listened;
        row.total_listening_time = seconds;
        row
    }

    #[test]
    fn test_trend_summary_totals() {
        let days = vec![day("u1", 1, 2, 1, 60), day("u1", 3, 0, 2, 120)];
        let summary = TrendSummary::from_days(7, &days);

        assert_eq!(summary.window_days, 7);
        assert_eq!(summary.active_days, 2);
        assert_eq!(summary.attractions_visited, 2);
        assert_eq!(summary.audio_guides_listened, 3);
        assert_eq!(summary.total_listening_time, 180);
        assert_eq!(summary.average_listening_time, 90.0);
    }

    #[test]
    fn test_trend_summary_empty_window() {
        let summary = TrendSummary::from_days(30, &[]);
        assert_eq!(summary.active_days, 0);
        assert_eq!(summary.average_listening_time, 0.0);
    }

    #[test]
    fn test_platform_activity_counts_distinct_users() {
        let days = vec![
            day("u1", 1, 1, 0, 0),
            day("u1", 2, 1, 0, 0),
            day("u2", 2, 0, 1, 30),
            day("u3", 2, 0, 0, 0),
        ];
        let activity = PlatformActivity::from_days(30, &days);

        assert_eq!(activity.active_users, 2);
        assert_eq!(activity.attractions_visited, 2);
        assert_eq!(activity.total_listening_time, 30);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let days = vec![
            day("u1", 1, u32::MAX, 0, u64::MAX),
            day("u2", 1, 1, 0, 1),
        ];

        let activity = PlatformActivity::from_days(30, &days);
        assert_eq!(activity.attractions_visited, u32::MAX);
        assert_eq!(activity.total_listening_time, u64::MAX);

        let summary = TrendSummary::from_days(7, &days);
        assert_eq!(summary.attractions_visited, u32::MAX);
        assert_eq!(summary.total_listening_time, u64::MAX);
    }
}
