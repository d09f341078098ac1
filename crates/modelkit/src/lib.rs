//! # modelkit: record mixins for sqlx/Postgres applications
//!
//! Reusable building blocks that application models compose instead of
//! reimplementing: audit timestamps stamped by the CRUD layer, per-instance
//! lazy-value caches with explicit invalidation, per-type registries of
//! named/typed/defaulted parameters backed by a persisted JSON document, and
//! an incrementing-version scheme for named records driven by a shared
//! counter table.
//!
//! Everything persistence-touching goes through `sqlx` against Postgres.
//! Operations either complete or fail with a [`ModelError`]; serialization
//! across concurrent writers is the caller's transaction discipline, except
//! for version counters which advance atomically in the database.

pub mod database;
pub mod error;
pub mod lazy;
pub mod model;
pub mod params;
pub mod versioning;

// Re-export core traits and types
pub use database::*;
pub use error::*;
pub use lazy::*;
pub use model::*;
pub use params::*;
pub use versioning::*;
