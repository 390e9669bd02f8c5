//! Error types for catalog operations.
//!
//! Provides a unified error type covering I/O, serialization, schema
//! construction in either builder, configuration and package verification.

use thiserror::Error;

/// Errors that can occur while building, querying or exporting the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A built-in command definition is structurally invalid.
    #[error("command schema error: {0}")]
    Schema(#[from] agent_schema_core::SchemaError),

    /// A built-in form definition is structurally invalid.
    #[error("form schema error: {0}")]
    Form(#[from] agent_schema_forms::SchemaError),

    /// A form update was rejected.
    #[error("form update error: {0}")]
    Update(#[from] agent_schema_forms::UpdateError),

    /// No agent with this name is enabled in the catalog.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// Two agents were registered under the same name.
    #[error("duplicate agent: {0}")]
    DuplicateAgent(String),

    /// Configuration values are out of range or contradictory.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Bundle hash mismatch between the recorded and recomputed values.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
