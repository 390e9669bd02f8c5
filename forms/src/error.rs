//! Error types for form construction and runtime updates.

use thiserror::Error;

use crate::FieldKind;

/// Structural violation detected while a form is built or finalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid field key: '{0}'")]
    InvalidKey(String),
    #[error("duplicate field key: {0}")]
    DuplicateKey(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field '{0}' must span at least one row and one column")]
    ZeroSpan(String),
    #[error("fields '{first}' and '{second}' both occupy cell ({row}, {col})")]
    Overlap {
        first: String,
        second: String,
        row: u32,
        col: u32,
    },
    /// A dependency rule lists its own source among its targets.
    #[error("dependency rule on '{0}' targets its own source")]
    SelfMutation(String),
    /// A dependency rule is keyed on a field that never changes value.
    #[error("field '{0}' carries no value and cannot source a dependency rule")]
    InvalidRuleSource(String),
    #[error("invalid options for field '{key}': {reason}")]
    InvalidOptions { key: String, reason: String },
    /// Two form schemas were registered for the same variant.
    #[error("a form is already registered for variant {0}")]
    VariantConflict(String),
}

/// Rejected runtime update. The form state is unchanged when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    /// The value's type does not match the field kind.
    #[error("field '{key}' of kind {kind} cannot take this value")]
    ValueMismatch { key: String, kind: FieldKind },
    /// The value has the right type but is not acceptable (unknown combo
    /// item, out-of-range number, unparsable date).
    #[error("field '{key}' rejected value '{value}'")]
    ValueRejected { key: String, value: String },
    /// A handler returned a mutation for a field its rule did not declare.
    #[error("rule on '{trigger}' mutated undeclared target '{target}'")]
    UndeclaredTarget { trigger: String, target: String },
    #[error("mutation {mutation} does not apply to field '{key}'")]
    MutationMismatch { key: String, mutation: &'static str },
    #[error("invalid range for field '{key}': {min} > {max}")]
    InvalidRange { key: String, min: i64, max: i64 },
    /// Saved values were not a JSON object.
    #[error("saved values must be a JSON object")]
    InvalidValues,
}
