//! Parameter System - typed, registered configuration values on records
//!
//! - `value`: the closed set of parameter kinds and their values
//! - `registry`: per-type parameter catalogs, built once and immutable
//! - `parametrized`: the persisted parameter document and its accessors
//! - `report`: presentation-only registry renderings

pub mod parametrized;
pub mod registry;
pub mod report;
pub mod value;

// Re-export main types and traits for convenience
pub use parametrized::{registry_for, ParamSet, ParamSlot, Parametrized};
pub use registry::{ParamRegistry, ParamSpec, RegistryBuilder};
pub use report::{report_html, report_json, report_rows, report_text, ReportRow};
pub use value::{ParamKind, ParamValue};
