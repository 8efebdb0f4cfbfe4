// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod daily;
pub mod feature;
pub mod stats;

pub use activity::{ActivityEvent, ActivityKind, EventRefs};
pub use daily::{ActivityDelta, DailyActivity};
pub use feature::{FeatureFlag, FlagMetadata, FlagPatch, NewFeatureFlag};
pub use stats::{FlagStats, PlatformActivity, TrendSummary};
