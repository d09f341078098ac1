//! Version counter - one row per (class, name) pair in the `versions` table
//!
//! The counter hands out version numbers via a single-statement increment,
//! so concurrent minters against the same row never observe the same value.
//! Creating the row for a name's first version is a separate find-or-create
//! step (see `Versioned::mint_version`) and does assume external
//! serialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Pool, Postgres, Row};

use crate::error::{ModelError, ModelResult};
use crate::model::{CrudOperations, Model};

/// DDL for the shared counter table.
pub const VERSIONS_SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS versions (
    id BIGSERIAL PRIMARY KEY,
    class_name VARCHAR(256) NOT NULL,
    record_name VARCHAR(256) NOT NULL,
    max_version BIGINT NOT NULL DEFAULT 0
)";

const FIND_SQL: &str =
    "SELECT * FROM versions WHERE class_name = $1 AND record_name = $2 LIMIT 1";

const ADVANCE_SQL: &str =
    "UPDATE versions SET max_version = max_version + 1 WHERE id = $1 RETURNING max_version";

/// Tracks the highest version issued for one (class, name) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionCounter {
    pub id: Option<i64>,
    pub class_name: String,
    pub record_name: String,
    pub max_version: i64,
}

impl VersionCounter {
    pub fn new(
        class_name: impl Into<String>,
        record_name: impl Into<String>,
        max_version: i64,
    ) -> Self {
        Self {
            id: None,
            class_name: class_name.into(),
            record_name: record_name.into(),
            max_version,
        }
    }

    /// The counter row for (class, name), if one exists.
    pub async fn find_for(
        pool: &Pool<Postgres>,
        class_name: &str,
        record_name: &str,
    ) -> ModelResult<Option<Self>> {
        let row = sqlx::query(FIND_SQL)
            .bind(class_name)
            .bind(record_name)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                ModelError::Database(format!(
                    "Failed to find version counter for {}/{}: {}",
                    class_name, record_name, e
                ))
            })?;

        row.map(|row| Self::from_row(&row)).transpose()
    }

    /// Insert a counter row seeded at `max_version` (the highest version
    /// already present for the pair, or 0).
    pub async fn create_seeded(
        pool: &Pool<Postgres>,
        class_name: &str,
        record_name: &str,
        max_version: i64,
    ) -> ModelResult<Self> {
        let counter = Self::create(pool, Self::new(class_name, record_name, max_version)).await?;
        tracing::debug!(
            class_name,
            record_name,
            max_version,
            "created version counter"
        );
        Ok(counter)
    }

    /// Advance the counter by one and return the new maximum. The increment
    /// and read happen in a single statement, so two concurrent callers get
    /// distinct values; visibility to other readers still follows the
    /// caller's transaction boundaries.
    pub async fn next_version(&mut self, pool: &Pool<Postgres>) -> ModelResult<i64> {
        let id = self.id.ok_or(ModelError::MissingPrimaryKey)?;

        let new_max: i64 = sqlx::query_scalar(ADVANCE_SQL)
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                ModelError::Database(format!("Failed to advance version counter {}: {}", id, e))
            })?;

        self.max_version = new_max;
        tracing::debug!(
            counter = id,
            max_version = new_max,
            "advanced version counter"
        );
        Ok(new_max)
    }
}

impl Model for VersionCounter {
    type PrimaryKey = i64;

    fn table_name() -> &'static str {
        "versions"
    }

    fn primary_key(&self) -> Option<i64> {
        self.id
    }

    fn set_primary_key(&mut self, key: i64) {
        self.id = Some(key);
    }

    fn clear_primary_key(&mut self) {
        self.id = None;
    }

    fn from_row(row: &sqlx::postgres::PgRow) -> ModelResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            class_name: row.try_get("class_name")?,
            record_name: row.try_get("record_name")?,
            max_version: row.try_get("max_version")?,
        })
    }

    fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        if let Some(id) = self.id {
            fields.insert("id".to_string(), Value::from(id));
        }
        fields.insert(
            "class_name".to_string(),
            Value::from(self.class_name.clone()),
        );
        fields.insert(
            "record_name".to_string(),
            Value::from(self.record_name.clone()),
        );
        fields.insert("max_version".to_string(), Value::from(self.max_version));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_sql_is_a_single_statement_increment() {
        assert_eq!(
            ADVANCE_SQL,
            "UPDATE versions SET max_version = max_version + 1 WHERE id = $1 RETURNING max_version"
        );
    }

    #[test]
    fn test_schema_matches_model_columns() {
        for column in ["id", "class_name", "record_name", "max_version"] {
            assert!(VERSIONS_SCHEMA_SQL.contains(column));
        }
        assert_eq!(VersionCounter::table_name(), "versions");
    }

    #[test]
    fn test_to_fields_for_new_counter() {
        let counter = VersionCounter::new("Report", "weekly", 3);
        let fields = counter.to_fields();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields.get("class_name"), Some(&Value::from("Report")));
        assert_eq!(fields.get("record_name"), Some(&Value::from("weekly")));
        assert_eq!(fields.get("max_version"), Some(&Value::from(3)));
    }

    #[tokio::test]
    async fn test_next_version_requires_a_persisted_row() {
        // a transient counter has no row to increment
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgresql://localhost/modelkit_test")
            .unwrap();
        let mut counter = VersionCounter::new("Report", "weekly", 0);
        let result = counter.next_version(&pool).await;
        assert!(matches!(result, Err(ModelError::MissingPrimaryKey)));
    }
}
