//! Core Model Trait - base definition for persisted records
//!
//! Table metadata, primary key handling, audit timestamp hooks, and the
//! row/field serialization contract every record type implements.

use std::collections::HashMap;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::model::primary_key::PrimaryKeyType;

/// Core trait for persisted records.
pub trait Model: Send + Sync + Debug + Serialize + for<'de> Deserialize<'de> {
    /// The type used for this model's surrogate primary key
    type PrimaryKey: PrimaryKeyType;

    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key column name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Get the primary key value for this model instance
    fn primary_key(&self) -> Option<Self::PrimaryKey>;

    /// Set the primary key value for this model instance
    fn set_primary_key(&mut self, key: Self::PrimaryKey);

    /// Detach this instance from its persisted identity: after clearing, the
    /// next save inserts a new row instead of updating the old one.
    fn clear_primary_key(&mut self);

    /// Whether the crud layer stamps audit timestamps (`created_at`,
    /// `updated_at`) on this model. `created_at` is set once at insert time
    /// and never changed again; `updated_at` is reset on every update.
    fn uses_timestamps() -> bool {
        false
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn set_created_at(&mut self, _timestamp: DateTime<Utc>) {}

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn set_updated_at(&mut self, _timestamp: DateTime<Utc>) {}

    /// Whether this instance is attached to a persisted row.
    fn is_persisted(&self) -> bool {
        self.primary_key().map(|pk| pk.is_set()).unwrap_or(false)
    }

    /// Create a model instance from a database row
    fn from_row(row: &sqlx::postgres::PgRow) -> ModelResult<Self>
    where
        Self: Sized;

    /// Convert model to column-value pairs for database operations. Unset
    /// columns (e.g. a `None` primary key) are omitted so the database can
    /// fill defaults.
    fn to_fields(&self) -> HashMap<String, serde_json::Value>;
}
