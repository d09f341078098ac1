//! Model System - trait seams for persisted records
//!
//! Decomposed the same way the operations are used:
//!
//! - `core_trait`: core `Model` trait (table metadata, primary key, audit
//!   timestamps, row/field serialization contract)
//! - `primary_key`: typed primary-key support for `i64`, `Uuid`, `String`
//! - `crud_operations`: create/read/update/delete with timestamp stamping
//! - `extensions`: save/refresh/exists and JSON document helpers

pub mod core_trait;
pub mod crud_operations;
pub mod extensions;
pub mod primary_key;

// Re-export main types and traits for convenience
pub use core_trait::Model;
pub use crud_operations::{stamp_for_insert, stamp_for_update, CrudOperations};
pub use extensions::ModelExtensions;
pub use primary_key::{PgQuery, PrimaryKeyType};
