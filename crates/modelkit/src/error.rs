//! Error types for the mixin layer
//!
//! One taxonomy for every failure the mixins can produce: database and
//! connection faults, missing records, validation and configuration
//! problems, and serialization failures. All errors are returned
//! synchronously to the immediate caller; nothing is retried internally.

use std::fmt;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error type shared by all mixins
#[derive(Debug, Clone)]
pub enum ModelError {
    /// Database connection or query error
    Database(String),
    /// Record not found in database
    NotFound(String),
    /// Input rejected: unregistered parameter, kind mismatch, bad identity
    Validation(String),
    /// Registry or setup misuse detected at build time
    Configuration(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Primary key is missing or invalid
    MissingPrimaryKey,
    /// Connection pool error
    Connection(String),
}

impl ModelError {
    /// Build a validation error, logging it first so operators get a
    /// diagnostic trail in addition to the caller-facing failure.
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error = %message, "validation failure");
        ModelError::Validation(message)
    }

    /// Build a configuration error, logging it first.
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error = %message, "configuration failure");
        ModelError::Configuration(message)
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Database(msg) => write!(f, "Database error: {}", msg),
            ModelError::NotFound(what) => write!(f, "Record not found: {}", what),
            ModelError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ModelError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ModelError::MissingPrimaryKey => write!(f, "Primary key is missing or invalid"),
            ModelError::Connection(msg) => write!(f, "Connection error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

// Convert from anyhow errors
impl From<anyhow::Error> for ModelError {
    fn from(err: anyhow::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}
