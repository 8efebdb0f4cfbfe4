// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ivoire Tourism: activity trends and feature flags for the Côte d'Ivoire
//! tourism app.
//!
//! This crate provides the backend API that records visitor activity,
//! aggregates it into daily trends, and serves feature flags to the client.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{ActivityRecorder, DailyAggregator, FeatureFlagService, TrendReporter};
use std::sync::Arc;

/// Shared application state, built once at startup and handed to every handler.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub recorder: ActivityRecorder,
    pub aggregator: DailyAggregator,
    pub trends: TrendReporter,
    pub features: FeatureFlagService,
}

impl AppState {
    /// Wire every service to the same store.
    pub fn new(config: Config, db: Arc<dyn Store>) -> Self {
        Self {
            config,
            recorder: ActivityRecorder::new(db.clone()),
            aggregator: DailyAggregator::new(db.clone()),
            trends: TrendReporter::new(db.clone()),
            features: FeatureFlagService::new(db.clone()),
            db,
        }
    }
}
