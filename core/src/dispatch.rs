//! Pre-dispatch hooks and structured command rewriting.
//!
//! The console parses operator input into an [`Invocation`] (a command path
//! plus typed arguments) and hands it to [`CommandSet::dispatch`]. If the
//! command carries a [`PreHook`], the hook may let the invocation through,
//! short-circuit with a message for the operator, or rewrite it into an
//! invocation of another registered command. Rewrites are structured: the
//! hook returns a target path and already-typed arguments, never a command
//! line that has to be parsed again.
//!
//! ```
//! use agent_schema_core::*;
//!
//! let run = CommandSpec::define("run")?
//!     .with_argument(ArgumentSpec::boolean("-o"))?
//!     .with_argument(ArgumentSpec::string("program", true))?
//!     .with_argument(ArgumentSpec::string("args", false))?;
//! let ps = CommandSpec::define("ps")?.with_subcommands([run])?;
//!
//! let shell = CommandSpec::define("shell")?
//!     .with_argument(ArgumentSpec::string("command", true))?
//!     .with_pre_hook(|ctx| {
//!         HookOutcome::Rewrite(
//!             Invocation::new(["ps", "run"])
//!                 .flag("-o")
//!                 .arg("program", ArgValue::String("cmd.exe".into()))
//!                 .arg("args", ArgValue::String(format!("/c {}", ctx.trailing_text()))),
//!         )
//!     });
//!
//! let set = CommandSet::build("beacon", vec![ps, shell])?;
//! let typed = Invocation::new(["shell"]).arg("command", ArgValue::String("whoami".into()));
//!
//! match set.dispatch("a1b2c3d4", "shell whoami /all", typed).unwrap() {
//!     DispatchOutcome::Rewritten { target, .. } => {
//!         assert_eq!(target.to_string(), "ps run -o cmd.exe \"/c whoami /all\"");
//!     }
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # Ok::<(), SchemaError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DispatchError;
use crate::{ArgKind, CommandSet, CommandSpec};

/// Typed argument value produced by the console's parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ArgValue {
    String(String),
    Int(i64),
    Bool(bool),
    /// Local path of a file to upload.
    File(String),
}

impl ArgValue {
    /// Returns `true` if this value can fill an argument of `kind`.
    pub fn fits(&self, kind: ArgKind) -> bool {
        matches!(
            (self, kind),
            (ArgValue::String(_), ArgKind::String | ArgKind::FlagString)
                | (ArgValue::Int(_), ArgKind::Int)
                | (ArgValue::Bool(_), ArgKind::Bool)
                | (ArgValue::File(_), ArgKind::File)
        )
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::String(s) | ArgValue::File(s) => f.write_str(s),
            ArgValue::Int(n) => write!(f, "{n}"),
            ArgValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One bound argument of an [`Invocation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationArg {
    /// Argument name as declared by the command (the flag token for Bool).
    pub name: String,
    /// Flag token when the argument was given in flag form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    pub value: ArgValue,
}

/// A command path with typed arguments, in the order they were bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub path: Vec<String>,
    pub args: Vec<InvocationArg>,
}

impl Invocation {
    /// Creates an invocation of the command at `path` with no arguments.
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            args: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, name: &str, value: ArgValue) -> Self {
        self.args.push(InvocationArg {
            name: name.to_string(),
            flag: None,
            value,
        });
        self
    }

    /// Appends a set Bool switch.
    pub fn flag(mut self, token: &str) -> Self {
        self.args.push(InvocationArg {
            name: token.to_string(),
            flag: Some(token.to_string()),
            value: ArgValue::Bool(true),
        });
        self
    }

    /// Appends a flag followed by a value, e.g. `-h 0.0.0.0`.
    pub fn flag_value(mut self, token: &str, name: &str, value: ArgValue) -> Self {
        self.args.push(InvocationArg {
            name: name.to_string(),
            flag: Some(token.to_string()),
            value,
        });
        self
    }

    /// Looks up a bound argument by name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// The command path joined with spaces.
    pub fn command_name(&self) -> String {
        self.path.join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_name())?;
        for arg in &self.args {
            match (&arg.flag, &arg.value) {
                (Some(flag), ArgValue::Bool(true)) => write!(f, " {flag}")?,
                (Some(_), ArgValue::Bool(false)) => {}
                (Some(flag), value) => write!(f, " {flag} {}", quote(&value.to_string()))?,
                (None, value) => write!(f, " {}", quote(&value.to_string()))?,
            }
        }
        Ok(())
    }
}

fn quote(text: &str) -> String {
    if text.is_empty() || text.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text.to_string()
    }
}

/// Everything a pre-hook may inspect.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Identity of the session the command targets.
    pub session_id: &'a str,
    /// Command line exactly as the operator typed it.
    pub cmdline: &'a str,
    /// Parsed invocation.
    pub invocation: &'a Invocation,
}

impl HookContext<'_> {
    /// Text typed after the command path, with original spacing preserved.
    ///
    /// ```
    /// use agent_schema_core::{HookContext, Invocation};
    ///
    /// let inv = Invocation::new(["shell"]);
    /// let ctx = HookContext { session_id: "1", cmdline: "  shell  dir  C:\\ ", invocation: &inv };
    /// assert_eq!(ctx.trailing_text(), "dir  C:\\");
    /// ```
    pub fn trailing_text(&self) -> &str {
        let mut rest = self.cmdline.trim();
        for segment in &self.invocation.path {
            match rest.strip_prefix(segment.as_str()) {
                Some(after) => rest = after.trim_start(),
                None => break,
            }
        }
        rest
    }

    /// Number of bound arguments.
    pub fn arg_count(&self) -> usize {
        self.invocation.args.len()
    }
}

/// Decision returned by a pre-hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Dispatch the invocation unchanged.
    Proceed,
    /// Do not dispatch; show this message to the operator.
    Message(String),
    /// Dispatch this invocation of another registered command instead.
    Rewrite(Invocation),
}

/// Rewrite function attached to a command.
///
/// Hooks must be pure functions of their [`HookContext`].
#[derive(Clone)]
pub struct PreHook(Arc<dyn Fn(&HookContext<'_>) -> HookOutcome + Send + Sync>);

impl PreHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> HookOutcome + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Runs the hook.
    pub fn call(&self, ctx: &HookContext<'_>) -> HookOutcome {
        (self.0)(ctx)
    }
}

impl fmt::Debug for PreHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PreHook(..)")
    }
}

impl PartialEq for PreHook {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Result of routing an invocation through a [`CommandSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Send the invocation to the agent as is.
    Forward(Invocation),
    /// A hook short-circuited with a message for the operator.
    Message(String),
    /// A hook replaced the invocation with one of another command.
    Rewritten {
        original: Invocation,
        target: Invocation,
    },
}

impl CommandSet {
    /// Routes `invocation` through its command's pre-hook.
    ///
    /// Rewriting is one hop: the target command's own hook is not run.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnknownCommand`] if the invocation path is not a
    ///   registered command;
    /// - [`DispatchError::UnknownRewriteTarget`] if a hook rewrites into a
    ///   path that is not a registered leaf command;
    /// - [`DispatchError::ArgumentMismatch`] or
    ///   [`DispatchError::MissingArgument`] if the rewritten arguments do not
    ///   fit the target's declaration.
    pub fn dispatch(
        &self,
        session_id: &str,
        cmdline: &str,
        invocation: Invocation,
    ) -> Result<DispatchOutcome, DispatchError> {
        let command = self
            .find(invocation.path.as_slice())
            .ok_or_else(|| DispatchError::UnknownCommand(invocation.command_name()))?;

        let Some(hook) = command.pre_hook() else {
            return Ok(DispatchOutcome::Forward(invocation));
        };

        let outcome = hook.call(&HookContext {
            session_id,
            cmdline,
            invocation: &invocation,
        });

        match outcome {
            HookOutcome::Proceed => Ok(DispatchOutcome::Forward(invocation)),
            HookOutcome::Message(message) => {
                debug!(command = %invocation.command_name(), "pre-hook short-circuited");
                Ok(DispatchOutcome::Message(message))
            }
            HookOutcome::Rewrite(target) => {
                let target_command = self
                    .find(target.path.as_slice())
                    .filter(|c| c.is_leaf())
                    .ok_or_else(|| DispatchError::UnknownRewriteTarget(target.command_name()))?;
                check_rewrite_args(target_command, &target)?;
                info!(
                    from = %invocation.command_name(),
                    to = %target.command_name(),
                    "pre-hook rewrote invocation"
                );
                Ok(DispatchOutcome::Rewritten {
                    original: invocation,
                    target,
                })
            }
        }
    }
}

/// A rewrite must render as a line that binds back to the same arguments:
/// flag kinds carry their declared token, positionals carry none and fill
/// the declared positional slots in order, and no argument repeats.
fn check_rewrite_args(command: &CommandSpec, target: &Invocation) -> Result<(), DispatchError> {
    let command_name = target.command_name();
    let mismatch = |argument: &str| DispatchError::ArgumentMismatch {
        command: command_name.clone(),
        argument: argument.to_string(),
    };

    let mut positionals = command.arguments.iter().filter(|spec| !spec.kind.is_flag());
    for (i, arg) in target.args.iter().enumerate() {
        let spec = command
            .arguments
            .iter()
            .find(|spec| spec.name == arg.name && arg.value.fits(spec.kind))
            .ok_or_else(|| mismatch(&arg.name))?;
        if target.args[..i].iter().any(|earlier| earlier.name == arg.name) {
            return Err(mismatch(&arg.name));
        }
        if spec.kind.is_flag() {
            if arg.flag != spec.flag {
                return Err(mismatch(&arg.name));
            }
        } else if arg.flag.is_some()
            || positionals.next().map(|slot| slot.name.as_str()) != Some(spec.name.as_str())
        {
            return Err(mismatch(&arg.name));
        }
    }

    if let Some(missing) = command
        .arguments
        .iter()
        .find(|spec| spec.required && target.get(&spec.name).is_none())
    {
        return Err(DispatchError::MissingArgument {
            command: command_name,
            argument: missing.name.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArgumentSpec;

    fn ps() -> CommandSpec {
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
        CommandSpec::define("ps")
            .unwrap()
            .with_subcommands([run])
            .unwrap()
    }

    fn cat() -> CommandSpec {
        CommandSpec::define("cat")
            .unwrap()
            .with_argument(ArgumentSpec::string("path", true))
            .unwrap()
    }

    #[test]
    fn test_forward_without_hook() {
        let set = CommandSet::build("beacon", vec![cat()]).unwrap();
        let inv = Invocation::new(["cat"]).arg("path", ArgValue::String("C:\\a.txt".into()));
        let outcome = set.dispatch("id", "cat C:\\a.txt", inv.clone()).unwrap();
        assert_eq!(outcome, DispatchOutcome::Forward(inv));
    }

    #[test]
    fn test_unknown_command() {
        let set = CommandSet::build("beacon", vec![cat()]).unwrap();
        let err = set
            .dispatch("id", "ps list", Invocation::new(["ps", "list"]))
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownCommand("ps list".to_string()));
    }

    #[test]
    fn test_message_short_circuit() {
        let guarded = cat().with_pre_hook(|ctx| {
            if ctx.arg_count() == 0 {
                HookOutcome::Message("path required".to_string())
            } else {
                HookOutcome::Proceed
            }
        });
        let set = CommandSet::build("beacon", vec![guarded]).unwrap();
        let outcome = set.dispatch("id", "cat", Invocation::new(["cat"])).unwrap();
        assert_eq!(outcome, DispatchOutcome::Message("path required".to_string()));
    }

    #[test]
    fn test_rewrite_into_internal_node_is_unknown_target() {
        let alias = cat().with_pre_hook(|_| HookOutcome::Rewrite(Invocation::new(["ps"])));
        let set = CommandSet::build("beacon", vec![ps(), alias]).unwrap();
        let err = set
            .dispatch("id", "cat x", Invocation::new(["cat"]))
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownRewriteTarget("ps".to_string()));
    }

    #[test]
    fn test_rewrite_argument_kind_checked() {
        let alias = cat().with_pre_hook(|_| {
            HookOutcome::Rewrite(Invocation::new(["ps", "run"]).arg("program", ArgValue::Int(1)))
        });
        let set = CommandSet::build("beacon", vec![ps(), alias]).unwrap();
        let err = set
            .dispatch("id", "cat x", Invocation::new(["cat"]))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::ArgumentMismatch {
                command: "ps run".to_string(),
                argument: "program".to_string()
            }
        );
    }

    fn socks() -> CommandSpec {
        let start = CommandSpec::define("start")
            .unwrap()
            .with_argument(ArgumentSpec::flag_string("-h", "address").with_default("0.0.0.0"))
            .unwrap()
            .with_argument(ArgumentSpec::int("port", true))
            .unwrap();
        CommandSpec::define("socks")
            .unwrap()
            .with_subcommands([start])
            .unwrap()
    }

    fn rewrite_into(target: Invocation) -> Result<DispatchOutcome, DispatchError> {
        let alias = cat().with_pre_hook(move |_| HookOutcome::Rewrite(target.clone()));
        let set = CommandSet::build("beacon", vec![ps(), socks(), alias]).unwrap();
        set.dispatch("id", "cat x", Invocation::new(["cat"]))
    }

    fn mismatch(command: &str, argument: &str) -> DispatchError {
        DispatchError::ArgumentMismatch {
            command: command.to_string(),
            argument: argument.to_string(),
        }
    }

    #[test]
    fn test_rewrite_flag_string_needs_its_token() {
        let positional = Invocation::new(["socks", "start"])
            .arg("address", ArgValue::String("127.0.0.1".into()))
            .arg("port", ArgValue::Int(1080));
        assert_eq!(
            rewrite_into(positional).unwrap_err(),
            mismatch("socks start", "address")
        );

        let flagged = Invocation::new(["socks", "start"])
            .flag_value("-h", "address", ArgValue::String("127.0.0.1".into()))
            .arg("port", ArgValue::Int(1080));
        match rewrite_into(flagged).unwrap() {
            DispatchOutcome::Rewritten { target, .. } => {
                assert_eq!(target.to_string(), "socks start -h 127.0.0.1 1080");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_rewrite_bool_needs_its_token() {
        let bare = Invocation::new(["ps", "run"])
            .arg("-o", ArgValue::Bool(true))
            .arg("program", ArgValue::String("cmd.exe".into()));
        assert_eq!(rewrite_into(bare).unwrap_err(), mismatch("ps run", "-o"));
    }

    #[test]
    fn test_rewrite_positional_rejects_flag_token() {
        let target = Invocation::new(["socks", "start"])
            .flag_value("-p", "port", ArgValue::Int(1080));
        assert_eq!(
            rewrite_into(target).unwrap_err(),
            mismatch("socks start", "port")
        );
    }

    #[test]
    fn test_rewrite_rejects_repeated_argument() {
        let target = Invocation::new(["ps", "run"])
            .flag("-o")
            .flag("-o")
            .arg("program", ArgValue::String("cmd.exe".into()));
        assert_eq!(rewrite_into(target).unwrap_err(), mismatch("ps run", "-o"));

        let target = Invocation::new(["ps", "run"])
            .arg("program", ArgValue::String("cmd.exe".into()))
            .arg("program", ArgValue::String("sh".into()));
        assert_eq!(rewrite_into(target).unwrap_err(), mismatch("ps run", "program"));
    }

    #[test]
    fn test_rewrite_positionals_follow_declaration_order() {
        let target = Invocation::new(["ps", "run"])
            .arg("args", ArgValue::String("/c dir".into()))
            .arg("program", ArgValue::String("cmd.exe".into()));
        assert_eq!(rewrite_into(target).unwrap_err(), mismatch("ps run", "args"));
    }

    #[test]
    fn test_rewrite_missing_required_argument() {
        let alias = cat().with_pre_hook(|_| {
            HookOutcome::Rewrite(Invocation::new(["ps", "run"]).flag("-o"))
        });
        let set = CommandSet::build("beacon", vec![ps(), alias]).unwrap();
        let err = set
            .dispatch("id", "cat x", Invocation::new(["cat"]))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::MissingArgument {
                command: "ps run".to_string(),
                argument: "program".to_string()
            }
        );
    }

    #[test]
    fn test_trailing_text_keeps_spacing() {
        let inv = Invocation::new(["ps", "run"]);
        let ctx = HookContext {
            session_id: "id",
            cmdline: "ps run  -o cmd.exe   /c dir",
            invocation: &inv,
        };
        assert_eq!(ctx.trailing_text(), "-o cmd.exe   /c dir");
    }

    #[test]
    fn test_display_quotes_values_with_spaces() {
        let inv = Invocation::new(["socks", "start"])
            .flag_value("-h", "address", ArgValue::String("0.0.0.0".into()))
            .arg("port", ArgValue::Int(1080))
            .arg("username", ArgValue::String("a b".into()));
        assert_eq!(inv.to_string(), "socks start -h 0.0.0.0 1080 \"a b\"");
    }
}
