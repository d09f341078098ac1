//! Versioning System - incrementing integer versions for named records
//!
//! - `counter`: the shared `versions` table tracking the highest version
//!   issued per (class, name) pair
//! - `versioned`: the record-side protocol for minting versions and
//!   detaching a row into a new version

pub mod counter;
pub mod versioned;

// Re-export main types and traits for convenience
pub use counter::{VersionCounter, VERSIONS_SCHEMA_SQL};
pub use versioned::{Versioned, VERSION_DELIMITER};
