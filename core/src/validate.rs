//! Structural validation of command trees.
//!
//! [`validate_commands`] walks a list of top-level commands recursively and
//! checks every invariant a [`CommandSpec`] tree must satisfy before it can
//! be presented to an operator:
//!
//! - command names are non-empty, whitespace-free and unique among siblings;
//! - every node is either a leaf (arguments only) or an internal node
//!   (subcommands only);
//! - every argument is well formed (see [`check_argument`]).
//!
//! Validation stops at the first violation.
//!
//! # Examples
//!
//! ```
//! use agent_schema_core::*;
//!
//! let pwd = CommandSpec::define("pwd")?;
//! assert!(validate_commands(&[pwd.clone()]).is_ok());
//!
//! // Fields are public, so a hand-assembled tree can break the leaf/internal
//! // invariant; the tree walk catches it.
//! let mut bad = CommandSpec::define("ps")?;
//! bad.arguments.push(ArgumentSpec::int("pid", true));
//! bad.subcommands.push(CommandSpec::define("list")?);
//! assert_eq!(
//!     validate_commands(&[pwd, bad]),
//!     Err(SchemaError::MixedNode("ps".to_string()))
//! );
//! # Ok::<(), SchemaError>(())
//! ```

use std::collections::HashSet;

use crate::error::SchemaError;
use crate::{ArgKind, ArgumentSpec, CommandSpec};

/// Validates a sibling list of commands and everything below it.
///
/// # Errors
///
/// Returns the first [`SchemaError`] found in depth-first order.
pub fn validate_commands(commands: &[CommandSpec]) -> Result<(), SchemaError> {
    let mut path = Vec::new();
    validate_siblings(commands, &mut path)
}

fn validate_siblings(commands: &[CommandSpec], path: &mut Vec<String>) -> Result<(), SchemaError> {
    let mut seen: HashSet<&str> = HashSet::new();

    for command in commands {
        let name = command.name.as_str();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(SchemaError::InvalidCommandName(name.to_string()));
        }
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateCommand {
                scope: scope_label(path),
                name: name.to_string(),
            });
        }

        path.push(name.to_string());
        let result = validate_node(command, path);
        path.pop();
        result?;
    }

    Ok(())
}

fn validate_node(command: &CommandSpec, path: &mut Vec<String>) -> Result<(), SchemaError> {
    let full_name = path.join(" ");

    if !command.arguments.is_empty() && !command.subcommands.is_empty() {
        return Err(SchemaError::MixedNode(full_name));
    }

    for (i, arg) in command.arguments.iter().enumerate() {
        check_argument(&full_name, arg, &command.arguments[..i])?;
    }

    validate_siblings(&command.subcommands, path)
}

fn scope_label(path: &[String]) -> String {
    if path.is_empty() {
        "<top-level>".to_string()
    } else {
        path.join(" ")
    }
}

/// Checks one argument against the arguments already declared before it.
///
/// # Errors
///
/// - [`SchemaError::EmptyArgumentName`] for an empty name;
/// - [`SchemaError::DuplicateArgument`] when the name or flag token is taken;
/// - [`SchemaError::RequiredWithDefault`] when required and defaulted;
/// - [`SchemaError::RequiredFlag`] when a Bool/FlagString is required;
/// - [`SchemaError::InvalidFlag`] when a flag-style argument lacks a token
///   starting with `-` or `/`;
/// - [`SchemaError::InvalidDefault`] when the default does not parse.
pub fn check_argument(
    command: &str,
    arg: &ArgumentSpec,
    existing: &[ArgumentSpec],
) -> Result<(), SchemaError> {
    if arg.name.trim().is_empty() {
        return Err(SchemaError::EmptyArgumentName(command.to_string()));
    }

    let clash = existing.iter().any(|other| {
        other.name == arg.name
            || arg.flag.as_deref().is_some_and(|f| other.matches_flag(f) || other.name == f)
            || other.flag.as_deref() == Some(arg.name.as_str())
    });
    if clash {
        return Err(SchemaError::DuplicateArgument {
            command: command.to_string(),
            argument: arg.name.clone(),
        });
    }

    if arg.required && arg.default_value.is_some() {
        return Err(SchemaError::RequiredWithDefault {
            command: command.to_string(),
            argument: arg.name.clone(),
        });
    }

    if arg.kind.is_flag() {
        if arg.required {
            return Err(SchemaError::RequiredFlag {
                command: command.to_string(),
                argument: arg.name.clone(),
            });
        }
        let valid_token = arg
            .flag
            .as_deref()
            .is_some_and(|f| f.len() >= 2 && (f.starts_with('-') || f.starts_with('/')));
        if !valid_token {
            return Err(SchemaError::InvalidFlag {
                command: command.to_string(),
                argument: arg.name.clone(),
            });
        }
    }

    if let Some(value) = &arg.default_value {
        let parses = match arg.kind {
            ArgKind::Int => value.trim().parse::<i64>().is_ok(),
            ArgKind::Bool => matches!(value.as_str(), "true" | "false"),
            ArgKind::String | ArgKind::File | ArgKind::FlagString => true,
        };
        if !parses {
            return Err(SchemaError::InvalidDefault {
                argument: arg.name.clone(),
                kind: arg.kind,
                value: value.clone(),
            });
        }
    }

    Ok(())
}
