//! Command and argument definitions.
//!
//! This module defines the declarative data model for console commands. A
//! [`CommandSpec`] is either a leaf carrying ordered [`ArgumentSpec`]s or an
//! internal node carrying subcommands, never both. Every mutating operation
//! checks the invariant it could break and leaves the command untouched on
//! failure.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::dispatch::{HookContext, HookOutcome, PreHook};
use crate::error::SchemaError;
use crate::validate::check_argument;

/// Kind of value an argument carries.
///
/// # Examples
///
/// ```
/// use agent_schema_core::ArgKind;
///
/// assert_eq!(ArgKind::Int.to_string(), "INT");
/// assert!(ArgKind::FlagString.is_flag());
/// assert!(!ArgKind::File.is_flag());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArgKind {
    /// Free text.
    String,
    /// Signed integer.
    Int,
    /// Presence switch (e.g. `-s`).
    Bool,
    /// Local file path, read by the console before dispatch.
    File,
    /// Flag token followed by a value (e.g. `-h <address>`).
    FlagString,
}

impl ArgKind {
    /// Returns `true` for presence-or-absence switches.
    pub fn is_flag(self) -> bool {
        matches!(self, ArgKind::Bool | ArgKind::FlagString)
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::String => "STRING",
            ArgKind::Int => "INT",
            ArgKind::Bool => "BOOL",
            ArgKind::File => "FILE",
            ArgKind::FlagString => "FLAG_STRING",
        })
    }
}

/// One parameter of a leaf command.
///
/// Positional arguments are bound in declaration order. Flag-style arguments
/// ([`ArgKind::Bool`] and [`ArgKind::FlagString`]) are switches and are never
/// required.
///
/// # Examples
///
/// ```
/// use agent_schema_core::{ArgKind, ArgumentSpec};
///
/// let pid = ArgumentSpec::int("pid", true);
/// assert!(pid.required);
///
/// let address = ArgumentSpec::flag_string("-h", "address")
///     .with_default("0.0.0.0")
///     .with_help("Listening interface address");
/// assert_eq!(address.kind, ArgKind::FlagString);
/// assert_eq!(address.usage_token(), "[-h address]");
///
/// let suspend = ArgumentSpec::boolean("-s");
/// assert_eq!(suspend.name, "-s");
/// assert!(!suspend.required);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Argument name (the flag token for Bool arguments)
    pub name: String,
    /// Kind of value
    pub kind: ArgKind,
    /// Flag token for Bool and FlagString arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    /// Must the operator supply it?
    pub required: bool,
    /// Value used when the operator omits the argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// One-line help
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl ArgumentSpec {
    fn positional(name: &str, kind: ArgKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            flag: None,
            required,
            default_value: None,
            help_text: None,
        }
    }

    /// Creates a positional string argument.
    pub fn string(name: &str, required: bool) -> Self {
        Self::positional(name, ArgKind::String, required)
    }

    /// Creates a positional integer argument.
    pub fn int(name: &str, required: bool) -> Self {
        Self::positional(name, ArgKind::Int, required)
    }

    /// Creates a positional file argument.
    pub fn file(name: &str, required: bool) -> Self {
        Self::positional(name, ArgKind::File, required)
    }

    /// Creates a boolean switch named after its flag token.
    pub fn boolean(flag: &str) -> Self {
        Self {
            name: flag.to_string(),
            kind: ArgKind::Bool,
            flag: Some(flag.to_string()),
            required: false,
            default_value: None,
            help_text: None,
        }
    }

    /// Creates a flag followed by a value, e.g. `-h <address>`.
    pub fn flag_string(flag: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ArgKind::FlagString,
            flag: Some(flag.to_string()),
            required: false,
            default_value: None,
            help_text: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    /// Sets the help text.
    pub fn with_help(mut self, text: &str) -> Self {
        self.help_text = Some(text.to_string());
        self
    }

    /// Returns `true` if `token` is this argument's flag token.
    pub fn matches_flag(&self, token: &str) -> bool {
        self.flag.as_deref() == Some(token)
    }

    /// Usage fragment: `<name>`, `[name]`, `[-s]` or `[-h address]`.
    pub fn usage_token(&self) -> String {
        let inner = match (self.kind, self.flag.as_deref()) {
            (ArgKind::Bool, Some(flag)) => flag.to_string(),
            (ArgKind::FlagString, Some(flag)) => format!("{flag} {}", self.name),
            _ => self.name.clone(),
        };
        if self.required {
            format!("<{inner}>")
        } else {
            format!("[{inner}]")
        }
    }
}

/// One invocable unit of the console.
///
/// Construct with [`define`](CommandSpec::define), then either add arguments
/// (making it a leaf) or subcommands (making it an internal node).
///
/// # Examples
///
/// ```
/// use agent_schema_core::{ArgumentSpec, CommandSpec};
///
/// let list = CommandSpec::define("list")?.with_description("List of jobs");
/// let kill = CommandSpec::define("kill")?
///     .with_description("Kill a specified job")
///     .with_argument(ArgumentSpec::string("task_id", true))?;
///
/// let mut job = CommandSpec::define("job")?.with_description("Long-running tasks manager");
/// job.add_subcommands([list, kill])?;
///
/// assert!(!job.is_leaf());
/// assert_eq!(job.subcommand_names(), vec!["list", "kill"]);
///
/// // An internal node cannot take arguments.
/// assert!(job.add_argument(ArgumentSpec::int("pid", true)).is_err());
/// # Ok::<(), agent_schema_core::SchemaError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Command name, unique among its siblings
    pub name: String,
    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Example invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_example: Option<String>,
    /// Extended help shown by `help <command>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_help: Option<String>,
    /// Ordered arguments (leaf commands only)
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
    /// Ordered subcommands (internal nodes only)
    #[serde(default)]
    pub subcommands: Vec<CommandSpec>,
    #[serde(
        rename = "pre_hook",
        default,
        skip_deserializing,
        serialize_with = "serialize_hook_marker"
    )]
    pre_hook: Option<PreHook>,
}

fn serialize_hook_marker<S: Serializer>(hook: &Option<PreHook>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bool(hook.is_some())
}

impl CommandSpec {
    /// Defines a new command.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidCommandName`] if `name` is empty or
    /// contains whitespace.
    pub fn define(name: &str) -> Result<Self, SchemaError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(SchemaError::InvalidCommandName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds an example invocation.
    pub fn with_example(mut self, example: &str) -> Self {
        self.usage_example = Some(example.to_string());
        self
    }

    /// Adds extended help text.
    pub fn with_long_help(mut self, text: &str) -> Self {
        self.long_help = Some(text.to_string());
        self
    }

    /// Appends an argument, making this command a leaf.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MixedNode`] if the command already has
    /// subcommands, or any argument-level error from validation (duplicate
    /// name, required with default, invalid flag, invalid default).
    pub fn add_argument(&mut self, spec: ArgumentSpec) -> Result<&mut Self, SchemaError> {
        if !self.subcommands.is_empty() {
            return Err(SchemaError::MixedNode(self.name.clone()));
        }
        check_argument(&self.name, &spec, &self.arguments)?;
        self.arguments.push(spec);
        Ok(self)
    }

    /// Consuming form of [`add_argument`](Self::add_argument).
    pub fn with_argument(mut self, spec: ArgumentSpec) -> Result<Self, SchemaError> {
        self.add_argument(spec)?;
        Ok(self)
    }

    /// Appends subcommands, making this command an internal node.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MixedNode`] if the command already has its own
    /// arguments, or [`SchemaError::DuplicateCommand`] if a child name
    /// collides with another child or an existing subcommand.
    pub fn add_subcommands(
        &mut self,
        children: impl IntoIterator<Item = CommandSpec>,
    ) -> Result<&mut Self, SchemaError> {
        let children: Vec<CommandSpec> = children.into_iter().collect();
        if children.is_empty() {
            return Ok(self);
        }
        if !self.arguments.is_empty() {
            return Err(SchemaError::MixedNode(self.name.clone()));
        }
        for (i, child) in children.iter().enumerate() {
            let clash = self.subcommands.iter().any(|s| s.name == child.name)
                || children[..i].iter().any(|c| c.name == child.name);
            if clash {
                return Err(SchemaError::DuplicateCommand {
                    scope: self.name.clone(),
                    name: child.name.clone(),
                });
            }
        }
        self.subcommands.extend(children);
        Ok(self)
    }

    /// Consuming form of [`add_subcommands`](Self::add_subcommands).
    pub fn with_subcommands(
        mut self,
        children: impl IntoIterator<Item = CommandSpec>,
    ) -> Result<Self, SchemaError> {
        self.add_subcommands(children)?;
        Ok(self)
    }

    /// Attaches a rewrite function invoked before dispatch.
    ///
    /// Replaces any previously attached hook.
    pub fn set_pre_hook<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&HookContext<'_>) -> HookOutcome + Send + Sync + 'static,
    {
        self.pre_hook = Some(PreHook::new(hook));
        self
    }

    /// Consuming form of [`set_pre_hook`](Self::set_pre_hook).
    pub fn with_pre_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> HookOutcome + Send + Sync + 'static,
    {
        self.set_pre_hook(hook);
        self
    }

    /// Returns the attached hook, if any.
    pub fn pre_hook(&self) -> Option<&PreHook> {
        self.pre_hook.as_ref()
    }

    /// A leaf has no subcommands (it may have zero arguments).
    pub fn is_leaf(&self) -> bool {
        self.subcommands.is_empty()
    }

    /// Finds a direct subcommand by name.
    pub fn find_subcommand(&self, name: &str) -> Option<&CommandSpec> {
        self.subcommands.iter().find(|s| s.name == name)
    }

    /// Finds an argument by name or flag token.
    pub fn find_argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.arguments
            .iter()
            .find(|a| a.name == name || a.matches_flag(name))
    }

    /// Gets all subcommand names in registration order.
    pub fn subcommand_names(&self) -> Vec<&str> {
        self.subcommands.iter().map(|s| s.name.as_str()).collect()
    }

    /// Argument part of the usage line, e.g. `[-s] [-o] <program> [args]`.
    pub fn usage_args(&self) -> String {
        self.arguments
            .iter()
            .map(ArgumentSpec::usage_token)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_rejects_bad_names() {
        assert_eq!(
            CommandSpec::define(""),
            Err(SchemaError::InvalidCommandName(String::new()))
        );
        assert!(CommandSpec::define("ps run").is_err());
        assert!(CommandSpec::define("download.chunksize").is_ok());
    }

    #[test]
    fn test_leaf_cannot_take_subcommands() {
        let mut cat = CommandSpec::define("cat").unwrap();
        cat.add_argument(ArgumentSpec::string("path", true)).unwrap();

        let err = cat
            .add_subcommands([CommandSpec::define("x").unwrap()])
            .unwrap_err();
        assert_eq!(err, SchemaError::MixedNode("cat".to_string()));
        assert!(cat.subcommands.is_empty());
    }

    #[test]
    fn test_internal_node_cannot_take_arguments() {
        let mut ps = CommandSpec::define("ps").unwrap();
        ps.add_subcommands([CommandSpec::define("list").unwrap()])
            .unwrap();

        let err = ps.add_argument(ArgumentSpec::int("pid", true)).unwrap_err();
        assert_eq!(err, SchemaError::MixedNode("ps".to_string()));
        assert!(ps.arguments.is_empty());
    }

    #[test]
    fn test_duplicate_subcommands_rejected_atomically() {
        let mut job = CommandSpec::define("job").unwrap();
        let err = job
            .add_subcommands([
                CommandSpec::define("list").unwrap(),
                CommandSpec::define("kill").unwrap(),
                CommandSpec::define("list").unwrap(),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateCommand {
                scope: "job".to_string(),
                name: "list".to_string()
            }
        );
        assert!(job.subcommands.is_empty());

        job.add_subcommands([CommandSpec::define("list").unwrap()])
            .unwrap();
        assert!(
            job.add_subcommands([CommandSpec::define("list").unwrap()])
                .is_err()
        );
    }

    #[test]
    fn test_required_with_default_rejected() {
        let mut ls = CommandSpec::define("ls").unwrap();
        let err = ls
            .add_argument(ArgumentSpec::string("directory", true).with_default("."))
            .unwrap_err();
        assert!(matches!(err, SchemaError::RequiredWithDefault { .. }));

        ls.add_argument(ArgumentSpec::string("directory", false).with_default("."))
            .unwrap();
        assert_eq!(ls.arguments.len(), 1);
    }

    #[test]
    fn test_usage_tokens() {
        let run = CommandSpec::define("run")
            .unwrap()
            .with_argument(ArgumentSpec::boolean("-s"))
            .unwrap()
            .with_argument(ArgumentSpec::boolean("-o"))
            .unwrap()
            .with_argument(ArgumentSpec::string("program", true))
            .unwrap()
            .with_argument(ArgumentSpec::string("args", false))
            .unwrap();
        assert_eq!(run.usage_args(), "[-s] [-o] <program> [args]");
        assert!(run.find_argument("-o").is_some());
        assert!(run.find_argument("program").is_some());
    }

    #[test]
    fn test_serialized_hook_marker() {
        let shell = CommandSpec::define("shell")
            .unwrap()
            .with_pre_hook(|_| HookOutcome::Proceed);
        let json = serde_json::to_value(&shell).unwrap();
        assert_eq!(json["pre_hook"], serde_json::Value::Bool(true));

        let back: CommandSpec = serde_json::from_value(json).unwrap();
        assert!(back.pre_hook().is_none());
        assert_eq!(back.name, "shell");
    }
}
