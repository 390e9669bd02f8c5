//! Operator-facing help text for a command set.
//!
//! [`render_overview`] lists the top-level commands, marking internal nodes
//! with `*`. [`render_command`] describes one command: its subcommands, or
//! its usage line and arguments.

use std::fmt::Write as _;

use crate::error::DispatchError;
use crate::{CommandSet, CommandSpec};

/// Column widths used when aligning help tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpStyle {
    /// Width of the command column in the overview.
    pub command_width: usize,
    /// Width of the subcommand column in a command's help.
    pub subcommand_width: usize,
}

impl Default for HelpStyle {
    fn default() -> Self {
        Self {
            command_width: 24,
            subcommand_width: 20,
        }
    }
}

/// Renders the command overview table.
///
/// ```
/// use agent_schema_core::*;
///
/// let pwd = CommandSpec::define("pwd")?.with_description("Print current working directory");
/// let list = CommandSpec::define("list")?;
/// let job = CommandSpec::define("job")?
///     .with_description("Long-running tasks manager")
///     .with_subcommands([list])?;
/// let set = CommandSet::build("beacon", vec![job, pwd])?;
///
/// let text = render_overview(&set, &HelpStyle::default());
/// assert!(text.contains("  job*"));
/// assert!(text.contains("Print current working directory"));
/// # Ok::<(), SchemaError>(())
/// ```
pub fn render_overview(set: &CommandSet, style: &HelpStyle) -> String {
    let mut out = String::new();
    out.push('\n');
    let _ = writeln!(out, "  {:<width$}      Description", "Command", width = style.command_width);
    let _ = writeln!(out, "  {:<width$}      -----------", "-------", width = style.command_width);

    for command in set.commands() {
        let mut name = command.name.clone();
        if !command.is_leaf() {
            name.push('*');
        }
        let _ = writeln!(
            out,
            "  {:<width$}      {}",
            name,
            command.description.as_deref().unwrap_or(""),
            width = style.command_width
        );
    }

    out
}

/// Renders help for the command at `path`.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownCommand`] if no command matches `path`.
pub fn render_command<S: AsRef<str>>(
    set: &CommandSet,
    path: &[S],
    style: &HelpStyle,
) -> Result<String, DispatchError> {
    let full_name = path
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    let command = set
        .find(path)
        .ok_or_else(|| DispatchError::UnknownCommand(full_name.clone()))?;

    let mut out = String::new();
    out.push('\n');
    let _ = writeln!(out, "  Command               : {full_name}");
    if let Some(desc) = &command.description {
        let _ = writeln!(out, "  Description           : {desc}");
    }
    if let Some(example) = &command.usage_example {
        let _ = writeln!(out, "  Example               : {example}");
    }
    if let Some(long_help) = &command.long_help {
        out.push('\n');
        for line in long_help.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }

    if !command.is_leaf() {
        write_subcommands(&mut out, command, style);
    } else if !command.arguments.is_empty() {
        write_arguments(&mut out, &full_name, command);
    }

    Ok(out)
}

fn write_subcommands(out: &mut String, command: &CommandSpec, style: &HelpStyle) {
    out.push('\n');
    let _ = writeln!(
        out,
        "  {:<width$}      Description",
        "SubCommand",
        width = style.subcommand_width
    );
    let _ = writeln!(
        out,
        "  {:<width$}      -----------",
        "----------",
        width = style.subcommand_width
    );
    for sub in &command.subcommands {
        let mut name = sub.name.clone();
        if !sub.is_leaf() {
            name.push('*');
        }
        let _ = writeln!(
            out,
            "  {:<width$}      {}",
            name,
            sub.description.as_deref().unwrap_or(""),
            width = style.subcommand_width
        );
    }
}

fn write_arguments(out: &mut String, full_name: &str, command: &CommandSpec) {
    let _ = writeln!(out, "  Usage                 : {full_name} {}", command.usage_args());
    out.push('\n');
    out.push_str("  Arguments:\n");

    let tokens: Vec<String> = command.arguments.iter().map(|a| a.usage_token()).collect();
    let width = tokens.iter().map(String::len).max().unwrap_or(0);

    for (arg, token) in command.arguments.iter().zip(&tokens) {
        let default = match &arg.default_value {
            Some(value) => format!(" (default: '{value}'). "),
            None => ". ".to_string(),
        };
        let _ = writeln!(
            out,
            "    {token:<width$}  : {}{default}{}",
            arg.kind,
            arg.help_text.as_deref().unwrap_or("")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArgumentSpec;

    fn sample_set() -> CommandSet {
        let start = CommandSpec::define("start")
            .unwrap()
            .with_description("Start a SOCKS proxy server")
            .with_example("socks start 1080")
            .with_argument(
                ArgumentSpec::flag_string("-h", "address")
                    .with_default("0.0.0.0")
                    .with_help("Listening interface address"),
            )
            .unwrap()
            .with_argument(ArgumentSpec::int("port", true).with_help("Listen port"))
            .unwrap();
        let stop = CommandSpec::define("stop").unwrap();
        let socks = CommandSpec::define("socks")
            .unwrap()
            .with_description("Managing socks tunnels")
            .with_subcommands([start, stop])
            .unwrap();
        CommandSet::build("beacon", vec![socks]).unwrap()
    }

    #[test]
    fn test_overview_marks_internal_nodes() {
        let text = render_overview(&sample_set(), &HelpStyle::default());
        let line = text.lines().find(|l| l.contains("socks")).unwrap();
        assert!(line.starts_with("  socks*"));
        assert!(line.ends_with("Managing socks tunnels"));
    }

    #[test]
    fn test_command_lists_subcommands() {
        let text = render_command(&sample_set(), &["socks"], &HelpStyle::default()).unwrap();
        assert!(text.contains("Command               : socks"));
        assert!(text.contains("SubCommand"));
        assert!(text.contains("  start"));
        assert!(text.contains("  stop"));
    }

    #[test]
    fn test_leaf_shows_usage_and_arguments() {
        let text =
            render_command(&sample_set(), &["socks", "start"], &HelpStyle::default()).unwrap();
        assert!(text.contains("Usage                 : socks start [-h address] <port>"));
        assert!(text.contains(
            "    [-h address]  : FLAG_STRING (default: '0.0.0.0'). Listening interface address"
        ));
        assert!(text.contains("    <port>        : INT. Listen port"));
        assert!(text.contains("Example               : socks start 1080"));
    }

    #[test]
    fn test_unknown_command() {
        let err = render_command(&sample_set(), &["socks", "pause"], &HelpStyle::default())
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownCommand("socks pause".to_string()));
    }
}
