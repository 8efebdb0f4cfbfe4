// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod features;
pub mod recorder;
pub mod trends;

pub use aggregator::DailyAggregator;
pub use features::{FeatureFlagService, FlagContext, FlagFilter};
pub use recorder::ActivityRecorder;
pub use trends::TrendReporter;
