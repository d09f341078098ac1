//! Primary Key System - typed key support for models
//!
//! Keys are bound to queries with their native Postgres types instead of
//! being stringified, so a `BIGINT` id column compares against a `BIGINT`
//! bind parameter.

use std::fmt::{Debug, Display};

use uuid::Uuid;

/// Query type alias used throughout the crud layer.
pub type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Types usable as a model's surrogate primary key.
pub trait PrimaryKeyType: Clone + Send + Sync + Debug + Display + 'static {
    /// Whether this key value identifies a persisted row (as opposed to a
    /// zero/nil/empty placeholder).
    fn is_set(&self) -> bool;

    /// Bind this key as the next positional parameter of `query`.
    fn bind_to<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q>;
}

impl PrimaryKeyType for i64 {
    fn is_set(&self) -> bool {
        *self != 0
    }

    fn bind_to<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(*self)
    }
}

impl PrimaryKeyType for Uuid {
    fn is_set(&self) -> bool {
        !self.is_nil()
    }

    fn bind_to<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(*self)
    }
}

impl PrimaryKeyType for String {
    fn is_set(&self) -> bool {
        !self.is_empty()
    }

    fn bind_to<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.clone())
    }
}
