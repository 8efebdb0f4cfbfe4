// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User activity events (append-only log).

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored field names used in queries.
pub mod fields {
    pub const USER_ID: &str = "userId";
    pub const TIMESTAMP: &str = "timestamp";
}

/// Action names accepted by the recorder.
pub const ACTIONS: [&str; 7] = [
    "visit",
    "listen",
    "review",
    "share",
    "favorite",
    "tour_start",
    "tour_complete",
];

/// What the user did, with the metadata that action carries.
///
/// Serialized adjacently tagged: `{"action": "listen", "metadata": {"duration": 30}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "metadata", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub enum ActivityKind {
    Visit {
        /// How the visit was detected ("qr", "geofence", "manual", ...)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    Listen {
        /// Seconds listened. Negative values are kept but never aggregated.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Review {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rating: Option<u8>,
    },
    Share {
        /// Share target ("whatsapp", "facebook", ...)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        platform: Option<String>,
    },
    Favorite {},
    TourStart {},
    TourComplete {},
}

impl ActivityKind {
    /// Build an activity kind from a raw action name and its metadata bag.
    ///
    /// Unknown actions and metadata of the wrong shape are validation errors.
    /// Metadata fields the action does not use are ignored.
    pub fn parse(action: &str, metadata: Option<serde_json::Value>) -> Result<Self, AppError> {
        if !ACTIONS.contains(&action) {
            return Err(AppError::Validation(format!(
                "Unknown action '{}': expected one of {}",
                action,
                ACTIONS.join(", ")
            )));
        }

        let metadata = match metadata {
            None | Some(serde_json::Value::Null) => serde_json::json!({}),
            Some(value) => value,
        };

        serde_json::from_value(serde_json::json!({
            "action": action,
            "metadata": metadata,
        }))
        .map_err(|e| AppError::Validation(format!("Invalid metadata for '{}': {}", action, e)))
    }

    /// Wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            ActivityKind::Visit { .. } => "visit",
            ActivityKind::Listen { .. } => "listen",
            ActivityKind::Review { .. } => "review",
            ActivityKind::Share { .. } => "share",
            ActivityKind::Favorite {} => "favorite",
            ActivityKind::TourStart {} => "tour_start",
            ActivityKind::TourComplete {} => "tour_complete",
        }
    }
}

/// Optional references to catalogue entities. Weak references: nothing
/// cascades when the referenced entity is deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct EventRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attraction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_guide_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tour_id: Option<String>,
}

/// Immutable activity event stored in the `activity_events` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct ActivityEvent {
    /// Document ID, assigned by the store on insert
    #[serde(default, alias = "_firestore_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(flatten)]
    pub kind: ActivityKind,
    #[serde(flatten)]
    pub refs: EventRefs,
    #[serde(with = "crate::time_utils::fixed_rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
}
