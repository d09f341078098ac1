//! CRUD Operations - create, read, update, delete for models
//!
//! Dynamic SQL with positional binds, audit-timestamp stamping at the two
//! points the contract defines (both stamps at insert, `updated_at` only on
//! update), and JSON-value binding for the field maps models produce.
//! Column order in generated statements is sorted so the SQL text is
//! deterministic and testable.

use chrono::Utc;
use serde_json::Value;
use sqlx::{Pool, Postgres};

use crate::error::{ModelError, ModelResult};
use crate::model::core_trait::Model;
use crate::model::primary_key::{PgQuery, PrimaryKeyType};

/// Trait providing CRUD operations for models
pub trait CrudOperations: Model {
    /// Find a model by its primary key
    async fn find(pool: &Pool<Postgres>, id: Self::PrimaryKey) -> ModelResult<Option<Self>>
    where
        Self: Sized,
    {
        let sql = select_sql(Self::table_name(), Self::primary_key_name());
        let row = id
            .bind_to(sqlx::query(&sql))
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                ModelError::Database(format!("Failed to find {}: {}", Self::table_name(), e))
            })?;

        row.map(|row| Self::from_row(&row)).transpose()
    }

    /// Find a model by its primary key or return an error if not found
    async fn find_or_fail(pool: &Pool<Postgres>, id: Self::PrimaryKey) -> ModelResult<Self>
    where
        Self: Sized,
    {
        Self::find(pool, id.clone())
            .await?
            .ok_or_else(|| ModelError::NotFound(format!("{}({})", Self::table_name(), id)))
    }

    /// Insert a new row for this model, stamping both audit timestamps when
    /// the model uses them. Returns the instance as the database stored it,
    /// including the generated primary key.
    async fn create(pool: &Pool<Postgres>, mut model: Self) -> ModelResult<Self>
    where
        Self: Sized,
    {
        stamp_for_insert(&mut model);

        let fields = model.to_fields();

        if fields.is_empty() {
            let sql = insert_default_sql(Self::table_name());
            let row = sqlx::query(&sql).fetch_one(pool).await.map_err(|e| {
                ModelError::Database(format!("Failed to create {}: {}", Self::table_name(), e))
            })?;
            return Self::from_row(&row);
        }

        let mut names: Vec<String> = fields.keys().cloned().collect();
        names.sort();

        let sql = insert_sql(Self::table_name(), &names);
        let mut query = sqlx::query(&sql);
        for name in &names {
            if let Some(value) = fields.get(name) {
                query = bind_json_value(query, value)?;
            }
        }

        let row = query.fetch_one(pool).await.map_err(|e| {
            ModelError::Database(format!("Failed to create {}: {}", Self::table_name(), e))
        })?;

        tracing::debug!(table = Self::table_name(), "inserted row");
        Self::from_row(&row)
    }

    /// Update this model's row, stamping `updated_at` when the model uses
    /// timestamps. `created_at` and the primary key are never rewritten.
    async fn update(&mut self, pool: &Pool<Postgres>) -> ModelResult<()>
    where
        Self: Sized,
    {
        let pk = self.primary_key().ok_or(ModelError::MissingPrimaryKey)?;

        stamp_for_update(self);

        let fields = self.to_fields();
        let pk_name = Self::primary_key_name();
        let mut names: Vec<String> = fields
            .keys()
            .filter(|name| name.as_str() != pk_name && name.as_str() != "created_at")
            .cloned()
            .collect();
        names.sort();

        if names.is_empty() {
            return Ok(());
        }

        let sql = update_sql(Self::table_name(), &names, pk_name);
        let mut query = sqlx::query(&sql);
        for name in &names {
            if let Some(value) = fields.get(name) {
                query = bind_json_value(query, value)?;
            }
        }
        query = pk.bind_to(query);

        query.execute(pool).await.map_err(|e| {
            ModelError::Database(format!("Failed to update {}: {}", Self::table_name(), e))
        })?;

        tracing::debug!(table = Self::table_name(), key = %pk, "updated row");
        Ok(())
    }

    /// Delete this model's row from the database
    async fn delete(self, pool: &Pool<Postgres>) -> ModelResult<()>
    where
        Self: Sized,
    {
        let pk = self.primary_key().ok_or(ModelError::MissingPrimaryKey)?;

        let sql = delete_sql(Self::table_name(), Self::primary_key_name());
        pk.bind_to(sqlx::query(&sql))
            .execute(pool)
            .await
            .map_err(|e| {
                ModelError::Database(format!("Failed to delete {}: {}", Self::table_name(), e))
            })?;

        tracing::debug!(table = Self::table_name(), key = %pk, "deleted row");
        Ok(())
    }
}

// Implement CrudOperations for all types that implement Model
impl<T: Model> CrudOperations for T {}

/// Bind a JSON value as the next positional parameter, using the native
/// Postgres type where one exists and JSONB for arrays and objects.
pub(crate) fn bind_json_value<'q>(query: PgQuery<'q>, value: &Value) -> ModelResult<PgQuery<'q>> {
    match value {
        Value::Null => Ok(query.bind(None::<String>)),
        Value::Bool(b) => Ok(query.bind(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(query.bind(i))
            } else if let Some(f) = n.as_f64() {
                Ok(query.bind(f))
            } else {
                Ok(query.bind(n.to_string()))
            }
        }
        Value::String(s) => Ok(query.bind(s.clone())),
        Value::Array(_) | Value::Object(_) => Ok(query.bind(sqlx::types::Json(value.clone()))),
    }
}

pub(crate) fn select_sql(table: &str, pk_name: &str) -> String {
    format!("SELECT * FROM {} WHERE {} = $1", table, pk_name)
}

pub(crate) fn insert_default_sql(table: &str) -> String {
    format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table)
}

pub(crate) fn insert_sql(table: &str, field_names: &[String]) -> String {
    let placeholders: Vec<String> = (1..=field_names.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        table,
        field_names.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn update_sql(table: &str, field_names: &[String], pk_name: &str) -> String {
    let assignments: Vec<String> = field_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = ${}", name, i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        table,
        assignments.join(", "),
        pk_name,
        field_names.len() + 1
    )
}

pub(crate) fn delete_sql(table: &str, pk_name: &str) -> String {
    format!("DELETE FROM {} WHERE {} = $1", table, pk_name)
}

/// Helper used by tests and callers that need the stamping behavior without
/// a round trip: applies the insert-time timestamp rule to `model`.
pub fn stamp_for_insert<M: Model>(model: &mut M) {
    if M::uses_timestamps() {
        let now = Utc::now();
        model.set_created_at(now);
        model.set_updated_at(now);
    }
}

/// Applies the update-time timestamp rule to `model`: only `updated_at`
/// moves, `created_at` keeps its insert-time value.
pub fn stamp_for_update<M: Model>(model: &mut M) {
    if M::uses_timestamps() {
        model.set_updated_at(Utc::now());
    }
}
