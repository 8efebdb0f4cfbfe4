// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feature flag model for storage and API.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_KEY_LEN: usize = 64;

fn default_category() -> String {
    "general".to_string()
}

/// Feature flag stored in the `feature_flags` collection.
///
/// The document ID is the normalized key, so `id == key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct FeatureFlag {
    pub id: String,
    /// Lowercase unique identifier, immutable after creation
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: FlagMetadata,
    /// Minimum client version the flag applies to (dotted numeric, e.g. "2.1.0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_version: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// Display and rollout metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct FlagMetadata {
    /// Higher priorities are listed first
    #[serde(default)]
    pub priority: i32,
    /// Share of users (0-100) that see the flag enabled, by stable hash bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 100))]
    pub rollout_percentage: Option<u8>,
}

/// Admin request to create a flag.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewFeatureFlag {
    pub key: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[serde(default = "default_category")]
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    #[validate(nested)]
    pub metadata: FlagMetadata,
    #[serde(default)]
    pub required_version: Option<String>,
}

/// Admin request to update a flag. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FlagPatch {
    /// Accepted only when it matches the stored key; keys are immutable.
    pub key: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    pub enabled: Option<bool>,
    #[validate(nested)]
    pub metadata: Option<FlagMetadata>,
    /// Empty string clears the requirement.
    pub required_version: Option<String>,
}

/// Normalize and validate a flag key.
///
/// Keys are trimmed and lowercased. After normalization they must be 1-64
/// characters of `[a-z0-9_.-]` and start with a letter or digit.
pub fn normalize_key(raw: &str) -> Result<String, AppError> {
    let key = raw.trim().to_lowercase();

    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'));
    let valid_start = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric());

    if key.is_empty() || key.len() > MAX_KEY_LEN || !valid_chars || !valid_start {
        return Err(AppError::Validation(format!(
            "Invalid feature key '{}': use 1-{} characters of a-z, 0-9, '_', '-', '.'",
            raw, MAX_KEY_LEN
        )));
    }

    Ok(key)
}

/// Whether `client` is at least `required`.
///
/// Versions compare numerically component by component; missing components
/// count as 0 and a trailing pre-release/build suffix is ignored. An unparseable
/// requirement imposes nothing; an unparseable client version never satisfies.
pub fn version_satisfies(client: &str, required: &str) -> bool {
    let Some(required) = parse_version(required) else {
        return true;
    };
    let Some(client) = parse_version(client) else {
        return false;
    };

    let len = client.len().max(required.len());
    let pad = |v: &[u64]| -> Vec<u64> {
        let mut v = v.to_vec();
        v.resize(len, 0);
        v
    };

    pad(&client) >= pad(&required)
}

fn parse_version(raw: &str) -> Option<Vec<u64>> {
    let core = raw
        .trim()
        .trim_start_matches('v')
        .split(['-', '+'])
        .next()?;
    if core.is_empty() {
        return None;
    }
    core.split('.').map(|part| part.parse().ok()).collect()
}

/// Stable rollout bucket in `0..100` for a (flag, user) pair.
pub fn rollout_bucket(key: &str, user_id: &str) -> u8 {
    let digest = Sha256::digest(format!("{}:{}", key, user_id).as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % 100) as u8
}

impl FeatureFlag {
    /// Build a new flag from a validated create request.
    pub fn from_new(new: NewFeatureFlag, key: String, now: DateTime<Utc>) -> Self {
        Self {
            id: key.clone(),
            key,
            name: new.name.trim().to_string(),
            description: new.description,
            category: new.category.trim().to_lowercase(),
            enabled: new.enabled,
            metadata: new.metadata,
            required_version: new.required_version.filter(|v| !v.trim().is_empty()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Rejects any attempt to change the key.
    pub fn apply_patch(&mut self, patch: FlagPatch, now: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(key) = patch.key {
            if key.trim().to_lowercase() != self.key {
                return Err(AppError::Validation(
                    "Feature key is immutable".to_string(),
                ));
            }
        }

        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category.trim().to_lowercase();
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        if let Some(version) = patch.required_version {
            self.required_version = Some(version).filter(|v| !v.trim().is_empty());
        }

        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  Dark_Mode ").unwrap(), "dark_mode");
        assert_eq!(normalize_key("offline-maps.v2").unwrap(), "offline-maps.v2");
        assert!(normalize_key("").is_err());
        assert!(normalize_key("_hidden").is_err());
        assert!(normalize_key("has space").is_err());
        assert!(normalize_key("a/b").is_err());
        assert!(normalize_key(&"k".repeat(65)).is_err());
    }

    #[test]
    fn test_version_satisfies() {
        assert!(version_satisfies("2.1.0", "2.1"));
        assert!(version_satisfies("2.10.0", "2.9.9"));
        assert!(version_satisfies("v3.0.0-beta.1", "3.0.0"));
        assert!(!version_satisfies("1.9", "2.0.0"));
        assert!(!version_satisfies("not-a-version", "1.0"));
        assert!(version_satisfies("1.0", "latest"));
    }

    #[test]
    fn test_rollout_bucket_is_stable_and_bounded() {
        let a = rollout_bucket("audio_guides_v2", "user-42");
        let b = rollout_bucket("audio_guides_v2", "user-42");
        assert_eq!(a, b);
        for i in 0..200 {
            assert!(rollout_bucket("flag", &format!("user-{}", i)) < 100);
        }
    }

    #[test]
    fn test_patch_rejects_key_change() {
        let now = Utc::now();
        let new = NewFeatureFlag {
            key: "dark_mode".to_string(),
            name: "Dark mode".to_string(),
            description: String::new(),
            category: "ui".to_string(),
            enabled: false,
            metadata: FlagMetadata::default(),
            required_version: None,
        };
        let mut flag = FeatureFlag::from_new(new, "dark_mode".to_string(), now);

        let patch = FlagPatch {
            key: Some("light_mode".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            flag.apply_patch(patch, now),
            Err(AppError::Validation(_))
        ));

        let patch = FlagPatch {
            key: Some("DARK_MODE".to_string()),
            enabled: Some(true),
            required_version: Some("2.0.0".to_string()),
            ..Default::default()
        };
        flag.apply_patch(patch, now).unwrap();
        assert!(flag.enabled);
        assert_eq!(flag.required_version.as_deref(), Some("2.0.0"));
    }
}
