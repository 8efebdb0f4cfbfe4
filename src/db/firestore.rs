// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activity events (append-only log)
//! - Daily activity aggregates (field-transform increments)
//! - Feature flags

use crate::db::{collections, Store};
use crate::error::AppError;
use crate::models::activity::fields as event_fields;
use crate::models::daily::fields;
use crate::models::{ActivityDelta, ActivityEvent, DailyActivity, FeatureFlag};
use async_trait::async_trait;
use chrono::NaiveDate;
use firestore::errors::FirestoreError;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection; skip credential lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Activity Event Operations ───────────────────────────────

    async fn insert_event(&self, event: &ActivityEvent) -> Result<ActivityEvent, AppError> {
        self.get_client()?
            .fluent()
            .insert()
            .into(collections::ACTIVITY_EVENTS)
            .generate_document_id()
            .object(event)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn recent_events(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ActivityEvent>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITY_EVENTS)
            .filter(move |q| q.for_all([q.field(event_fields::USER_ID).eq(user_id.clone())]))
            .order_by([(
                event_fields::TIMESTAMP,
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Daily Aggregate Operations ──────────────────────────────

    /// Upsert the (user, date) document in a single write: the key fields are
    /// set through a field mask and the counters move through server-side
    /// increment transforms, so concurrent writers never overwrite each other.
    async fn increment_daily(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ActivityDelta,
    ) -> Result<DailyActivity, AppError> {
        let doc_id = DailyActivity::doc_id(user_id, date);
        let mut seed = DailyActivity::new(user_id, date);
        seed.updated_at = Some(chrono::Utc::now());
        let increments = delta.increments();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields([fields::USER_ID, fields::DATE, fields::UPDATED_AT])
            .in_col(collections::DAILY_ACTIVITY)
            .document_id(&doc_id)
            .object(&seed)
            .transforms(|t| {
                let transforms: Vec<_> = increments
                    .iter()
                    .map(|(field, by)| t.field(*field).increment(*by))
                    .collect();
                t.fields(transforms)
            })
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_daily(user_id, date).await?.ok_or_else(|| {
            AppError::Database(format!("Daily aggregate {} missing after upsert", doc_id))
        })
    }

    async fn get_daily(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DAILY_ACTIVITY)
            .obj()
            .one(&DailyActivity::doc_id(user_id, date))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn daily_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivity>, AppError> {
        let user_id = user_id.to_string();
        let (from, to) = (from.to_string(), to.to_string());

        self.get_client()?
            .fluent()
            .select()
            .from(collections::DAILY_ACTIVITY)
            .filter(move |q| {
                q.for_all([
                    q.field(fields::USER_ID).eq(user_id.clone()),
                    q.field(fields::DATE).greater_than_or_equal(from.clone()),
                    q.field(fields::DATE).less_than_or_equal(to.clone()),
                ])
            })
            .order_by([(fields::DATE, firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn daily_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivity>, AppError> {
        let (from, to) = (from.to_string(), to.to_string());

        self.get_client()?
            .fluent()
            .select()
            .from(collections::DAILY_ACTIVITY)
            .filter(move |q| {
                q.for_all([
                    q.field(fields::DATE).greater_than_or_equal(from.clone()),
                    q.field(fields::DATE).less_than_or_equal(to.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Feature Flag Operations ─────────────────────────────────

    async fn get_flag(&self, id: &str) -> Result<Option<FeatureFlag>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FEATURE_FLAGS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_flags(&self) -> Result<Vec<FeatureFlag>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FEATURE_FLAGS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert fails server-side when the document exists, which makes the
    /// uniqueness check and the write a single atomic step.
    async fn insert_flag(&self, flag: &FeatureFlag) -> Result<(), AppError> {
        let result: Result<FeatureFlag, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::FEATURE_FLAGS)
            .document_id(&flag.id)
            .object(flag)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => Err(AppError::Conflict(format!(
                "Feature '{}' already exists",
                flag.key
            ))),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn put_flag(&self, flag: &FeatureFlag) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FEATURE_FLAGS)
            .document_id(&flag.id)
            .object(flag)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_flag(&self, id: &str) -> Result<bool, AppError> {
        if self.get_flag(id).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FEATURE_FLAGS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }
}
