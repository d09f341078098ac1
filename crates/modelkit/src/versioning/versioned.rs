//! Versioned records - name + incrementing version per logical entity
//!
//! A versioned record is *current* while attached to a persisted row.
//! `new_version` moves it to *detached-pending*: the next version number is
//! minted from the shared counter, the surrogate id is cleared so the next
//! save inserts instead of updating, and caller overrides are applied. The
//! previously stored row is left untouched.

use std::collections::HashMap;

use serde_json::Value;
use sqlx::{Pool, Postgres};

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::params::registry::short_type_name;
use crate::versioning::counter::VersionCounter;

/// Separator in `version_label` output, e.g. `nightly@4`.
pub const VERSION_DELIMITER: char = '@';

/// Protocol for records whose revisions are tracked by an incrementing
/// integer per logical name.
///
/// `(name, version)` pairs are kept unique per concrete type only by the
/// counter-increment protocol, not by a database constraint.
pub trait Versioned: Model {
    /// Logical identity of the record; shared by all of its versions.
    fn record_name(&self) -> &str;

    fn version(&self) -> i64;

    fn set_version_number(&mut self, version: i64);

    /// Label under which counters for this type are kept, defaulting to the
    /// type's short name.
    fn class_name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name::<Self>()
    }

    /// `"{name}@{version}"`
    fn version_label(&self) -> String {
        format!(
            "{}{}{}",
            self.record_name(),
            VERSION_DELIMITER,
            self.version()
        )
    }

    /// A versioned record must carry a non-empty name and a positive
    /// version number.
    fn validate_identity(&self) -> ModelResult<()>
    where
        Self: Sized,
    {
        if self.record_name().is_empty() {
            return Err(ModelError::validation(format!(
                "{} requires a non-empty record name",
                Self::class_name()
            )));
        }
        if self.version() < 1 {
            return Err(ModelError::validation(format!(
                "version must be a positive integer, got {}",
                self.version()
            )));
        }
        Ok(())
    }

    /// Highest version already stored for `record_name` in this type's own
    /// table, or 0 when none exist. Used to seed a fresh counter row.
    async fn max_stored_version(pool: &Pool<Postgres>, record_name: &str) -> ModelResult<i64>
    where
        Self: Sized,
    {
        let sql = format!(
            "SELECT CAST(COALESCE(MAX(version), 0) AS BIGINT) FROM {} WHERE name = $1",
            Self::table_name()
        );
        let max: i64 = sqlx::query_scalar(&sql)
            .bind(record_name)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                ModelError::Database(format!(
                    "Failed to read max stored version for {} '{}': {}",
                    Self::table_name(),
                    record_name,
                    e
                ))
            })?;
        Ok(max)
    }

    /// Mint the next version number for this record's (class, name) pair and
    /// assign it to the instance. The counter row is created on first use,
    /// seeded from the highest version already stored for the name; that
    /// find-or-create step assumes external serialization across concurrent
    /// first-minters.
    async fn mint_version(&mut self, pool: &Pool<Postgres>) -> ModelResult<i64>
    where
        Self: Sized,
    {
        self.validate_identity()?;

        let class_name = Self::class_name();
        let mut counter =
            match VersionCounter::find_for(pool, class_name, self.record_name()).await? {
                Some(counter) => counter,
                None => {
                    let seed = Self::max_stored_version(pool, self.record_name()).await?;
                    VersionCounter::create_seeded(pool, class_name, self.record_name(), seed)
                        .await?
                }
            };

        let version = counter.next_version(pool).await?;
        self.set_version_number(version);
        Ok(version)
    }

    /// Move to *detached-pending*: clear the surrogate id so the next save
    /// inserts a new row, then apply each override whose key names an
    /// existing field and whose value is non-null. Unknown keys and null
    /// values are skipped silently.
    fn detach_with_overrides(&mut self, overrides: &HashMap<String, Value>) -> ModelResult<()>
    where
        Self: Sized,
    {
        self.clear_primary_key();

        if overrides.is_empty() {
            return Ok(());
        }

        let mut doc = serde_json::to_value(&*self)?;
        let fields = doc.as_object_mut().ok_or_else(|| {
            ModelError::Serialization(format!(
                "{} does not serialize to a JSON object",
                Self::class_name()
            ))
        })?;

        let mut changed = false;
        for (key, value) in overrides {
            if value.is_null() {
                continue;
            }
            if let Some(slot) = fields.get_mut(key) {
                *slot = value.clone();
                changed = true;
            }
        }

        if changed {
            *self = serde_json::from_value(doc)?;
        }
        Ok(())
    }

    /// Produce the next version of this record: mint a version number,
    /// detach from the persisted identity, apply overrides. The returned
    /// instance is transient and ready for insertion as a new row; the
    /// original row remains in storage at its old version.
    async fn new_version(
        mut self,
        pool: &Pool<Postgres>,
        overrides: HashMap<String, Value>,
    ) -> ModelResult<Self>
    where
        Self: Sized,
    {
        self.mint_version(pool).await?;
        self.detach_with_overrides(&overrides)?;
        tracing::debug!(record = %self.version_label(), "prepared new record version");
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Report {
        id: Option<i64>,
        name: String,
        version: i64,
        query: Option<String>,
    }

    impl Model for Report {
        type PrimaryKey = i64;

        fn table_name() -> &'static str {
            "reports"
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
            Ok(Report {
                id: Some(1),
                name: "hydrated".to_string(),
                version: 1,
                query: None,
            })
        }

        fn to_fields(&self) -> HashMap<String, Value> {
            let mut fields = HashMap::new();
            if let Some(id) = self.id {
                fields.insert("id".to_string(), Value::from(id));
            }
            fields.insert("name".to_string(), Value::from(self.name.clone()));
            fields.insert("version".to_string(), Value::from(self.version));
            if let Some(query) = &self.query {
                fields.insert("query".to_string(), Value::from(query.clone()));
            }
            fields
        }
    }

    impl Versioned for Report {
        fn record_name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> i64 {
            self.version
        }

        fn set_version_number(&mut self, version: i64) {
            self.version = version;
        }
    }

    fn report() -> Report {
        Report {
            id: Some(42),
            name: "weekly".to_string(),
            version: 2,
            query: Some("select 1".to_string()),
        }
    }

    #[test]
    fn test_version_label_uses_delimiter() {
        assert_eq!(report().version_label(), "weekly@2");
        assert_eq!(Report::class_name(), "Report");
    }

    #[test]
    fn test_validate_identity_rejects_empty_name() {
        let mut r = report();
        r.name.clear();
        assert!(matches!(
            r.validate_identity(),
            Err(ModelError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_identity_rejects_non_positive_version() {
        let mut r = report();
        r.version = 0;
        assert!(matches!(
            r.validate_identity(),
            Err(ModelError::Validation(_))
        ));

        r.version = 2;
        assert!(r.validate_identity().is_ok());
    }

    #[test]
    fn test_detach_clears_primary_key() {
        let mut r = report();
        r.detach_with_overrides(&HashMap::new()).unwrap();
        assert_eq!(r.id, None);
        // everything else untouched
        assert_eq!(r.name, "weekly");
        assert_eq!(r.version, 2);
    }

    #[test]
    fn test_detach_applies_overrides_to_existing_fields() {
        let mut r = report();
        let mut overrides = HashMap::new();
        overrides.insert("query".to_string(), Value::from("select 2"));
        overrides.insert("name".to_string(), Value::from("monthly"));

        r.detach_with_overrides(&overrides).unwrap();
        assert_eq!(r.id, None);
        assert_eq!(r.query.as_deref(), Some("select 2"));
        assert_eq!(r.name, "monthly");
    }

    #[test]
    fn test_detach_skips_null_and_unknown_overrides() {
        let mut r = report();
        let mut overrides = HashMap::new();
        overrides.insert("query".to_string(), Value::Null);
        overrides.insert("owner".to_string(), Value::from("ops"));

        r.detach_with_overrides(&overrides).unwrap();
        assert_eq!(r.id, None);
        // null override ignored, unknown key ignored
        assert_eq!(r.query.as_deref(), Some("select 1"));
    }

    #[tokio::test]
    async fn test_new_version_rejects_empty_name_before_database_work() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgresql://localhost/modelkit_test")
            .unwrap();

        let mut r = report();
        r.name.clear();
        let result = r.new_version(&pool, HashMap::new()).await;
        assert!(matches!(result, Err(ModelError::Validation(_))));
    }
}
