//! Console side of command dispatch: turning a typed line into an
//! [`Invocation`] the registry can route.
//!
//! Tokens are whitespace separated; double quotes keep inner whitespace and
//! accept `\"` and `\\` escapes. A quote left open runs to the end of the
//! line. Binding resolves the longest command path, then fills flags and
//! positional arguments in declaration order.

use std::sync::LazyLock;

use agent_schema_core::{ArgKind, ArgValue, ArgumentSpec, CommandSet, CommandSpec, Invocation};
use regex::Regex;
use thiserror::Error;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:\\.|[^"\\])*)"|"((?:\\.|[^"\\])*\\?)\z|(\S+)"#)
        .expect("static regex must compile")
});

/// Failure turning a command line into an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("'{command}' needs a subcommand: {choices}")]
    MissingSubcommand { command: String, choices: String },
    #[error("flag '{flag}' of '{command}' needs a value")]
    MissingFlagValue { command: String, flag: String },
    #[error("argument '{argument}' expects an integer, got '{value}'")]
    InvalidInt { argument: String, value: String },
    #[error("'{command}' is missing required argument '{argument}'")]
    MissingArgument { command: String, argument: String },
    #[error("unexpected argument '{token}' for '{command}'")]
    UnexpectedToken { command: String, token: String },
}

/// Splits a command line into tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    TOKEN_RE
        .captures_iter(line)
        .filter_map(|caps| {
            if let Some(quoted) = caps.get(1).or_else(|| caps.get(2)) {
                Some(unescape(quoted.as_str()))
            } else {
                caps.get(3).map(|bare| bare.as_str().to_string())
            }
        })
        .collect()
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Binds `tokens` against the commands of `set`.
///
/// # Errors
///
/// Returns a [`BindError`] when the path is unknown or incomplete, a value
/// is missing or malformed, or a required argument is left unbound.
pub fn bind(set: &CommandSet, tokens: &[String]) -> Result<Invocation, BindError> {
    let first = tokens.first().ok_or(BindError::Empty)?;
    let (command, consumed) = set
        .resolve(tokens)
        .ok_or_else(|| BindError::UnknownCommand(first.clone()))?;
    let path = &tokens[..consumed];
    let name = path.join(" ");

    if !command.is_leaf() {
        return Err(BindError::MissingSubcommand {
            command: name,
            choices: command.subcommand_names().join(", "),
        });
    }

    let values = bind_values(command, &name, &tokens[consumed..])?;

    let mut invocation = Invocation::new(path.iter().cloned());
    for (spec, value) in command.arguments.iter().zip(values) {
        let Some(value) = value.or_else(|| default_value(spec)) else {
            if spec.required {
                return Err(BindError::MissingArgument {
                    command: name,
                    argument: spec.name.clone(),
                });
            }
            continue;
        };
        invocation = match (spec.kind, spec.flag.as_deref()) {
            // An unset switch is simply not sent.
            (ArgKind::Bool, Some(_)) if value == ArgValue::Bool(false) => invocation,
            (ArgKind::Bool, Some(flag)) => invocation.flag(flag),
            (ArgKind::FlagString, Some(flag)) => invocation.flag_value(flag, &spec.name, value),
            _ => invocation.arg(&spec.name, value),
        };
    }
    Ok(invocation)
}

/// One slot per declared argument, filled from the tokens after the path.
fn bind_values(
    command: &CommandSpec,
    name: &str,
    rest: &[String],
) -> Result<Vec<Option<ArgValue>>, BindError> {
    let args = &command.arguments;
    let mut values: Vec<Option<ArgValue>> = vec![None; args.len()];
    let mut last_positional: Option<usize> = None;

    let mut i = 0;
    while i < rest.len() {
        let token = &rest[i];

        if let Some(idx) = args.iter().position(|a| a.kind.is_flag() && a.matches_flag(token)) {
            if args[idx].kind == ArgKind::Bool {
                values[idx] = Some(ArgValue::Bool(true));
            } else {
                let value = rest.get(i + 1).ok_or_else(|| BindError::MissingFlagValue {
                    command: name.to_string(),
                    flag: token.clone(),
                })?;
                values[idx] = Some(ArgValue::String(value.clone()));
                i += 1;
            }
            i += 1;
            continue;
        }

        let next_slot = args
            .iter()
            .enumerate()
            .position(|(idx, a)| !a.kind.is_flag() && values[idx].is_none());
        if let Some(idx) = next_slot {
            values[idx] = Some(parse_value(&args[idx], token)?);
            last_positional = Some(idx);
            i += 1;
            continue;
        }

        // Trailing free text continues the last positional string.
        match last_positional.and_then(|idx| values[idx].as_mut()) {
            Some(ArgValue::String(text)) => {
                for extra in &rest[i..] {
                    text.push(' ');
                    text.push_str(extra);
                }
                break;
            }
            _ => {
                return Err(BindError::UnexpectedToken {
                    command: name.to_string(),
                    token: token.clone(),
                });
            }
        }
    }

    Ok(values)
}

fn parse_value(spec: &ArgumentSpec, raw: &str) -> Result<ArgValue, BindError> {
    match spec.kind {
        ArgKind::Int => raw
            .parse::<i64>()
            .map(ArgValue::Int)
            .map_err(|_| BindError::InvalidInt {
                argument: spec.name.clone(),
                value: raw.to_string(),
            }),
        ArgKind::Bool => Ok(ArgValue::Bool(raw == "true")),
        ArgKind::File => Ok(ArgValue::File(raw.to_string())),
        ArgKind::String | ArgKind::FlagString => Ok(ArgValue::String(raw.to_string())),
    }
}

/// Declared default, already validated against the kind when the command
/// was defined.
fn default_value(spec: &ArgumentSpec) -> Option<ArgValue> {
    let raw = spec.default_value.as_deref()?;
    parse_value(spec, raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_schema_catalog::Catalog;

    fn beacon_http() -> CommandSet {
        let catalog = Catalog::builtin().unwrap();
        catalog
            .commands("beacon", &"http/windows".parse().unwrap())
            .unwrap()
    }

    fn bind_line(set: &CommandSet, line: &str) -> Result<Invocation, BindError> {
        bind(set, &tokenize(line))
    }

    #[test]
    fn test_tokenize_quotes_and_escapes() {
        assert_eq!(
            tokenize(r#"ps run -s cmd.exe "whoami /all""#),
            vec!["ps", "run", "-s", "cmd.exe", "whoami /all"]
        );
        assert_eq!(tokenize(r#"  upload "a \"b\" c"  x "#), vec!["upload", "a \"b\" c", "x"]);
        assert_eq!(tokenize(r#"cd "C:\\Program Files""#), vec!["cd", "C:\\Program Files"]);
        assert_eq!(tokenize(r"cd C:\Windows"), vec!["cd", "C:\\Windows"]);
        assert_eq!(tokenize(r#"echo """#), vec!["echo", ""]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_tokenize_unterminated_quote_runs_to_end() {
        assert_eq!(
            tokenize(r#"cd "C:\Program Files"#),
            vec!["cd", "C:\\Program Files"]
        );
        assert_eq!(tokenize(r#"upload a.txt "b c\"#), vec!["upload", "a.txt", "b c\\"]);
        assert_eq!(tokenize(r#"echo ""#), vec!["echo", ""]);
    }

    #[test]
    fn test_bool_false_default_is_not_sent() {
        let run = CommandSpec::define("run")
            .unwrap()
            .with_argument(ArgumentSpec::boolean("-s").with_default("false"))
            .unwrap()
            .with_argument(ArgumentSpec::boolean("-w").with_default("true"))
            .unwrap()
            .with_argument(ArgumentSpec::string("program", true))
            .unwrap();
        let set = CommandSet::build("demo", vec![run]).unwrap();

        let inv = bind_line(&set, "run cmd.exe").unwrap();
        assert_eq!(inv.get("-s"), None);
        assert_eq!(inv.get("-w"), Some(&ArgValue::Bool(true)));
        assert_eq!(inv.to_string(), "run -w cmd.exe");

        let inv = bind_line(&set, "run -s cmd.exe").unwrap();
        assert_eq!(inv.get("-s"), Some(&ArgValue::Bool(true)));
        assert_eq!(inv.to_string(), "run -s -w cmd.exe");
    }

    #[test]
    fn test_bind_nested_with_int() {
        let set = beacon_http();
        let inv = bind_line(&set, "link tcp 192.168.1.2 8888").unwrap();
        assert_eq!(inv.path, vec!["link", "tcp"]);
        assert_eq!(inv.get("target"), Some(&ArgValue::String("192.168.1.2".into())));
        assert_eq!(inv.get("port"), Some(&ArgValue::Int(8888)));

        assert_eq!(
            bind_line(&set, "link tcp 192.168.1.2 http"),
            Err(BindError::InvalidInt {
                argument: "port".into(),
                value: "http".into(),
            })
        );
    }

    #[test]
    fn test_bind_flags_anywhere() {
        let set = beacon_http();
        let inv = bind_line(&set, "socks start 1080 -auth user pass").unwrap();
        assert_eq!(inv.get("port"), Some(&ArgValue::Int(1080)));
        assert_eq!(inv.get("-auth"), Some(&ArgValue::Bool(true)));
        assert_eq!(inv.get("-socks4"), None);
        assert_eq!(inv.get("address"), Some(&ArgValue::String("0.0.0.0".into())));
        assert_eq!(inv.get("username"), Some(&ArgValue::String("user".into())));
        assert_eq!(inv.to_string(), "socks start -h 0.0.0.0 1080 -auth user pass");

        let inv = bind_line(&set, "socks start -h 127.0.0.1 1080").unwrap();
        assert_eq!(inv.get("address"), Some(&ArgValue::String("127.0.0.1".into())));

        assert_eq!(
            bind_line(&set, "socks start 1080 -h"),
            Err(BindError::MissingFlagValue {
                command: "socks start".into(),
                flag: "-h".into(),
            })
        );
    }

    #[test]
    fn test_trailing_text_joins_last_string() {
        let set = beacon_http();
        let inv = bind_line(&set, "shell whoami /all").unwrap();
        assert_eq!(inv.get("command"), Some(&ArgValue::String("whoami /all".into())));

        let inv = bind_line(&set, "ps run -o cmd.exe /c dir C:\\").unwrap();
        assert_eq!(inv.get("program"), Some(&ArgValue::String("cmd.exe".into())));
        assert_eq!(inv.get("args"), Some(&ArgValue::String("/c dir C:\\".into())));
    }

    #[test]
    fn test_defaults_and_missing_arguments() {
        let set = beacon_http();
        let inv = bind_line(&set, "ls").unwrap();
        assert_eq!(inv.get("directory"), Some(&ArgValue::String(".".into())));

        assert_eq!(
            bind_line(&set, "cp a.txt"),
            Err(BindError::MissingArgument {
                command: "cp".into(),
                argument: "dst".into(),
            })
        );
        assert_eq!(
            bind_line(&set, "pwd now"),
            Err(BindError::UnexpectedToken {
                command: "pwd".into(),
                token: "now".into(),
            })
        );
        assert!(matches!(
            bind_line(&set, "job"),
            Err(BindError::MissingSubcommand { .. })
        ));
        assert_eq!(
            bind_line(&set, "whoami"),
            Err(BindError::UnknownCommand("whoami".into()))
        );
        assert_eq!(bind(&set, &[]), Err(BindError::Empty));
    }

    #[test]
    fn test_file_arguments() {
        let set = beacon_http();
        let inv = bind_line(&set, "upload /tmp/a.txt C:\\Temp\\a.txt").unwrap();
        assert_eq!(inv.get("local_file"), Some(&ArgValue::File("/tmp/a.txt".into())));
        assert_eq!(
            inv.get("remote_path"),
            Some(&ArgValue::String("C:\\Temp\\a.txt".into()))
        );
    }
}
