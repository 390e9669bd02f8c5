//! Error types for command schema construction and dispatch.
//!
//! [`SchemaError`] covers every structural violation detected while a
//! command tree is being defined or frozen. [`DispatchError`] is raised only
//! while an invocation is being routed through the registry.

use thiserror::Error;

use crate::ArgKind;

/// Structural violation in a command definition.
///
/// Raised at construction time. A definition step that fails with this error
/// leaves the command or group it was operating on unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Command name is empty or contains whitespace.
    #[error("invalid command name: '{0}'")]
    InvalidCommandName(String),
    /// Group name is empty.
    #[error("command group name cannot be empty")]
    EmptyGroupName,
    /// Two siblings (subcommands or top-level commands) share a name.
    #[error("duplicate command in scope '{scope}': {name}")]
    DuplicateCommand { scope: String, name: String },
    /// A command would have both its own arguments and subcommands.
    #[error("command '{0}' cannot have both arguments and subcommands")]
    MixedNode(String),
    /// Argument name is empty.
    #[error("command '{0}' has an argument with an empty name")]
    EmptyArgumentName(String),
    /// Two arguments of one command share a name or flag token.
    #[error("duplicate argument in command '{command}': {argument}")]
    DuplicateArgument { command: String, argument: String },
    /// A required argument also declares a default value.
    #[error("argument '{argument}' of command '{command}' is required and has a default")]
    RequiredWithDefault { command: String, argument: String },
    /// A Bool or FlagString argument is marked as required.
    #[error("flag argument '{argument}' of command '{command}' cannot be required")]
    RequiredFlag { command: String, argument: String },
    /// A flag-style argument has no usable flag token.
    #[error("argument '{argument}' of command '{command}' has an invalid flag token")]
    InvalidFlag { command: String, argument: String },
    /// A default value does not parse as the argument's kind.
    #[error("default '{value}' of argument '{argument}' is not a valid {kind}")]
    InvalidDefault {
        argument: String,
        kind: ArgKind,
        value: String,
    },
    /// A variant was bound to two command sets.
    #[error("variant {variant} is already bound to group '{group}'")]
    VariantConflict { variant: String, group: String },
}

/// Failure while routing an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No registered command matches the invocation path.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// A pre-hook asked for a rewrite into a command that is not registered.
    #[error("rewrite target is not a registered command: {0}")]
    UnknownRewriteTarget(String),
    /// A rewritten argument is not declared by its target, or has the wrong kind.
    #[error("argument '{argument}' does not match command '{command}'")]
    ArgumentMismatch { command: String, argument: String },
    /// A rewrite omits a required argument of its target.
    #[error("rewrite into '{command}' is missing required argument '{argument}'")]
    MissingArgument { command: String, argument: String },
}

/// Failure parsing a [`Variant`](crate::Variant) or one of its parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantParseError {
    #[error("variant must be '<transport>/<os>': {0}")]
    Malformed(String),
    #[error("unknown transport: {0}")]
    UnknownTransport(String),
    #[error("unknown OS family: {0}")]
    UnknownOs(String),
}
