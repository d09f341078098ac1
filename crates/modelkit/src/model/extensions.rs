//! Model Extensions - utility methods for model instances
//!
//! Convenience methods layered over the crud operations: refresh, existence
//! checks, save, and JSON document (de)serialization of whole records.

use sqlx::{Pool, Postgres};

use crate::error::{ModelError, ModelResult};
use crate::model::core_trait::Model;
use crate::model::crud_operations::CrudOperations;
use crate::model::primary_key::PrimaryKeyType;

/// Extension trait for models with additional utility methods
pub trait ModelExtensions: Model + CrudOperations {
    /// Refresh this model instance from the database
    async fn refresh(&mut self, pool: &Pool<Postgres>) -> ModelResult<()>
    where
        Self: Sized,
    {
        if let Some(pk) = self.primary_key() {
            if let Some(refreshed) = Self::find(pool, pk).await? {
                *self = refreshed;
                Ok(())
            } else {
                Err(ModelError::NotFound(Self::table_name().to_string()))
            }
        } else {
            Err(ModelError::MissingPrimaryKey)
        }
    }

    /// Check if this model instance exists in the database
    async fn exists(&self, pool: &Pool<Postgres>) -> ModelResult<bool>
    where
        Self: Sized,
    {
        if let Some(pk) = self.primary_key() {
            Ok(Self::find(pool, pk).await?.is_some())
        } else {
            Ok(false)
        }
    }

    /// Insert or update depending on whether this instance is attached to a
    /// persisted row.
    async fn save(&mut self, pool: &Pool<Postgres>) -> ModelResult<()>
    where
        Self: Sized + Clone,
    {
        let attached = self.primary_key().map(|pk| pk.is_set()).unwrap_or(false);
        if attached && self.exists(pool).await? {
            self.update(pool).await
        } else {
            // Insert; `create` takes ownership, so clone and adopt the
            // database's view of the new row (including the generated key).
            let created = Self::create(pool, self.clone()).await?;
            *self = created;
            Ok(())
        }
    }

    /// Serialize the full record to a JSON object. Timestamps come out as
    /// RFC 3339 strings.
    fn to_document(&self) -> ModelResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Assign fields from a JSON object onto this instance. Every key must
    /// name an existing field; unknown keys fail with a validation error and
    /// leave the instance untouched. In-memory only - persist with `save`.
    fn apply_document(&mut self, document: &serde_json::Value) -> ModelResult<()>
    where
        Self: Sized,
    {
        let incoming = document.as_object().ok_or_else(|| {
            ModelError::validation(format!(
                "document for {} must be a JSON object",
                Self::table_name()
            ))
        })?;

        let mut current = serde_json::to_value(&*self)?;
        let fields = current.as_object_mut().ok_or_else(|| {
            ModelError::Serialization(format!(
                "{} does not serialize to a JSON object",
                Self::table_name()
            ))
        })?;

        for (key, value) in incoming {
            if !fields.contains_key(key) {
                return Err(ModelError::validation(format!(
                    "unknown field '{}' for {}",
                    key,
                    Self::table_name()
                )));
            }
            fields.insert(key.clone(), value.clone());
        }

        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

// Implement ModelExtensions for all types that implement Model + CrudOperations
impl<T: Model + CrudOperations> ModelExtensions for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Channel {
        id: Option<i64>,
        name: String,
        capacity: i64,
    }

    impl Model for Channel {
        type PrimaryKey = i64;

        fn table_name() -> &'static str {
            "channels"
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

        fn from_row(_row: &sqlx::postgres::PgRow) -> ModelResult<Self> {
            Ok(Channel {
                id: Some(1),
                name: "hydrated".to_string(),
                capacity: 0,
            })
        }

        fn to_fields(&self) -> HashMap<String, Value> {
            let mut fields = HashMap::new();
            if let Some(id) = self.id {
                fields.insert("id".to_string(), Value::from(id));
            }
            fields.insert("name".to_string(), Value::from(self.name.clone()));
            fields.insert("capacity".to_string(), Value::from(self.capacity));
            fields
        }
    }

    fn sample() -> Channel {
        Channel {
            id: Some(5),
            name: "alerts".to_string(),
            capacity: 100,
        }
    }

    #[test]
    fn test_to_document_round_trips() {
        let channel = sample();
        let doc = channel.to_document().unwrap();
        assert_eq!(doc, json!({"id": 5, "name": "alerts", "capacity": 100}));
    }

    #[test]
    fn test_apply_document_assigns_known_fields() {
        let mut channel = sample();
        channel
            .apply_document(&json!({"name": "audit", "capacity": 250}))
            .unwrap();
        assert_eq!(channel.name, "audit");
        assert_eq!(channel.capacity, 250);
        assert_eq!(channel.id, Some(5));
    }

    #[test]
    fn test_apply_document_rejects_unknown_field() {
        let mut channel = sample();
        let result = channel.apply_document(&json!({"name": "audit", "colour": "red"}));
        assert!(matches!(result, Err(ModelError::Validation(_))));
        // failed application leaves the instance untouched
        assert_eq!(channel, sample());
    }

    #[test]
    fn test_apply_document_rejects_non_object() {
        let mut channel = sample();
        let result = channel.apply_document(&json!([1, 2, 3]));
        assert!(matches!(result, Err(ModelError::Validation(_))));
    }
}
