// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feature flag service.
//!
//! Keys are case-insensitive: every lookup lowercases first. A flag that does
//! not exist reads as disabled rather than as an error.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::feature::{normalize_key, rollout_bucket, version_satisfies};
use crate::models::{FeatureFlag, FlagPatch, FlagStats, NewFeatureFlag};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use validator::Validate;

const MAX_CONCURRENT_SEED_WRITES: usize = 8;

/// Filter for [`FeatureFlagService::list`].
#[derive(Debug, Clone, Default)]
pub struct FlagFilter {
    pub enabled_only: bool,
    pub category: Option<String>,
}

/// Who is asking, for rollout and version gating.
#[derive(Debug, Clone, Default)]
pub struct FlagContext {
    pub user_id: Option<String>,
    pub client_version: Option<String>,
}

#[derive(Clone)]
pub struct FeatureFlagService {
    db: Arc<dyn Store>,
}

impl FeatureFlagService {
    pub fn new(db: Arc<dyn Store>) -> Self {
        Self { db }
    }

    /// Fetch a flag by key (case-insensitive).
    ///
    /// A key that could never have been created (bad characters, too long)
    /// is absent without a store lookup.
    pub async fn get(&self, key: &str) -> Result<Option<FeatureFlag>> {
        match normalize_key(key) {
            Ok(key) => self.db.get_flag(&key).await,
            Err(_) => Ok(None),
        }
    }

    /// Whether a flag is on. Unknown keys are off.
    pub async fn is_enabled(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some_and(|f| f.enabled))
    }

    /// Whether a flag is on for a particular client.
    ///
    /// Off when the flag is missing or disabled, when the client is older than
    /// the flag's required version, or when the user falls outside the rollout
    /// percentage. Without a user id a percentage rollout is ignored.
    pub async fn is_enabled_for(&self, key: &str, ctx: &FlagContext) -> Result<bool> {
        let Some(flag) = self.get(key).await? else {
            return Ok(false);
        };
        if !flag.enabled {
            return Ok(false);
        }

        if let (Some(required), Some(client)) = (&flag.required_version, &ctx.client_version) {
            if !version_satisfies(client, required) {
                return Ok(false);
            }
        }

        if let (Some(percentage), Some(user_id)) =
            (flag.metadata.rollout_percentage, &ctx.user_id)
        {
            return Ok(rollout_bucket(&flag.key, user_id) < percentage);
        }

        Ok(true)
    }

    /// Flags matching `filter`, by priority (highest first) then name.
    pub async fn list(&self, filter: &FlagFilter) -> Result<Vec<FeatureFlag>> {
        let category = filter.category.as_deref().map(|c| c.trim().to_lowercase());

        let mut flags: Vec<FeatureFlag> = self
            .db
            .list_flags()
            .await?
            .into_iter()
            .filter(|f| !filter.enabled_only || f.enabled)
            .filter(|f| category.as_ref().map_or(true, |c| &f.category == c))
            .collect();

        flags.sort_by(|a, b| {
            b.metadata
                .priority
                .cmp(&a.metadata.priority)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(flags)
    }

    /// Create a flag. Duplicate keys (in any case) are a conflict.
    pub async fn create(&self, new: NewFeatureFlag) -> Result<FeatureFlag> {
        new.validate()?;
        let key = normalize_key(&new.key)?;
        let flag = FeatureFlag::from_new(new, key, Utc::now());

        self.db.insert_flag(&flag).await?;

        tracing::info!(key = %flag.key, enabled = flag.enabled, "Feature flag created");
        Ok(flag)
    }

    /// Flip a flag's `enabled` state.
    pub async fn toggle(&self, id: &str) -> Result<FeatureFlag> {
        let mut flag = self.require(id).await?;
        flag.enabled = !flag.enabled;
        flag.updated_at = Utc::now();

        self.db.put_flag(&flag).await?;

        tracing::info!(key = %flag.key, enabled = flag.enabled, "Feature flag toggled");
        Ok(flag)
    }

    /// Partially update a flag. The key cannot change.
    pub async fn update(&self, id: &str, patch: FlagPatch) -> Result<FeatureFlag> {
        patch.validate()?;
        let mut flag = self.require(id).await?;
        flag.apply_patch(patch, Utc::now())?;

        self.db.put_flag(&flag).await?;

        tracing::info!(key = %flag.key, "Feature flag updated");
        Ok(flag)
    }

    /// Hard delete a flag.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = normalize_key(id)
            .map_err(|_| AppError::NotFound(format!("Feature '{}' not found", id)))?;
        if !self.db.delete_flag(&id).await? {
            return Err(AppError::NotFound(format!("Feature '{}' not found", id)));
        }

        tracing::info!(key = %id, "Feature flag deleted");
        Ok(())
    }

    /// Counts for the admin dashboard.
    pub async fn stats(&self) -> Result<FlagStats> {
        Ok(FlagStats::from_flags(&self.db.list_flags().await?))
    }

    /// Create any seed flags that do not exist yet. Existing flags are left
    /// untouched. Returns how many were created.
    pub async fn seed(&self, flags: Vec<NewFeatureFlag>) -> Result<usize> {
        let results = stream::iter(flags)
            .map(|new| async move {
                match self.create(new).await {
                    Ok(_) => Ok(true),
                    Err(AppError::Conflict(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            })
            .buffer_unordered(MAX_CONCURRENT_SEED_WRITES)
            .collect::<Vec<Result<bool>>>()
            .await;

        let mut created = 0;
        for result in results {
            if result? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Load seed flags from a JSON array file.
    pub fn load_seed_file(path: &str) -> anyhow::Result<Vec<NewFeatureFlag>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn require(&self, id: &str) -> Result<FeatureFlag> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Feature '{}' not found", id)))
    }
}
