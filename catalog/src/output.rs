//! Output formatting for command sets and forms.

use agent_schema_core::{CommandSet, CommandSpec};
use agent_schema_forms::FormSchema;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
    Table,
}

/// Formats a command set in the requested output format.
pub fn format_commands(set: &CommandSet, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(set)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(set).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(commands_to_markdown(set)),
        OutputFormat::Table => Ok(commands_to_table(set)),
    }
}

/// Formats a form schema in the requested output format.
pub fn format_form(schema: &FormSchema, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(schema)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(schema).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(form_to_markdown(schema)),
        OutputFormat::Table => Ok(form_to_table(schema)),
    }
}

/// Leaf commands with their full paths, depth first in declaration order.
fn leaves(set: &CommandSet) -> Vec<(String, &CommandSpec)> {
    fn walk<'a>(prefix: &str, command: &'a CommandSpec, out: &mut Vec<(String, &'a CommandSpec)>) {
        let path = if prefix.is_empty() {
            command.name.clone()
        } else {
            format!("{prefix} {}", command.name)
        };
        if command.is_leaf() {
            out.push((path, command));
        } else {
            for child in &command.subcommands {
                walk(&path, child, out);
            }
        }
    }

    let mut out = Vec::new();
    for command in set.commands() {
        walk("", command, &mut out);
    }
    out
}

fn usage(path: &str, command: &CommandSpec) -> String {
    let args = command.usage_args();
    if args.is_empty() {
        path.to_string()
    } else {
        format!("{path} {args}")
    }
}

fn commands_to_markdown(set: &CommandSet) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", set.group()));
    if set.is_empty() {
        out.push_str("_No commands._\n");
        return out;
    }

    out.push_str("| Command | Usage | Description |\n");
    out.push_str("|---------|-------|-------------|\n");
    for (path, command) in leaves(set) {
        let desc = command.description.as_deref().unwrap_or("");
        out.push_str(&format!(
            "| `{path}` | `{}` | {desc} |\n",
            usage(&path, command)
        ));
    }
    out.push('\n');

    let mut first = true;
    for (path, command) in leaves(set) {
        if command.arguments.is_empty() {
            continue;
        }
        if first {
            out.push_str("## Arguments\n\n");
            first = false;
        }
        out.push_str(&format!("### {path}\n\n"));
        out.push_str("| Argument | Kind | Required | Default | Description |\n");
        out.push_str("|----------|------|----------|---------|-------------|\n");
        for arg in &command.arguments {
            let name = arg.usage_token();
            let default = arg.default_value.as_deref().unwrap_or("");
            let help = arg.help_text.as_deref().unwrap_or("");
            let required = if arg.required { "yes" } else { "no" };
            out.push_str(&format!(
                "| `{name}` | {} | {required} | {default} | {help} |\n",
                arg.kind
            ));
        }
        out.push('\n');
    }

    out
}

fn commands_to_table(set: &CommandSet) -> String {
    let mut out = String::new();

    out.push_str(&format!("Group: {}  Commands: {}\n", set.group(), set.len()));

    let rows: Vec<(String, &str)> = leaves(set)
        .into_iter()
        .map(|(path, command)| {
            (
                usage(&path, command),
                command.description.as_deref().unwrap_or(""),
            )
        })
        .collect();
    let width = rows.iter().map(|(u, _)| u.len()).max().unwrap_or(7);

    for (usage, desc) in rows {
        out.push_str(&format!("  {usage:<width$}  {desc}\n"));
    }

    out
}

fn form_value(schema: &FormSchema, key: &str) -> String {
    schema
        .field(key)
        .and_then(|f| f.value_json())
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_default()
}

fn form_to_markdown(schema: &FormSchema) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Form for {}\n\n", schema.variant()));
    out.push_str("| Key | Kind | Visible | Position | Value |\n");
    out.push_str("|-----|------|---------|----------|-------|\n");
    for field in schema.fields() {
        let position = field
            .position()
            .map(|p| format!("{},{} ({}x{})", p.row, p.col, p.row_span, p.col_span))
            .unwrap_or_default();
        out.push_str(&format!(
            "| `{}` | {} | {} | {position} | {} |\n",
            field.key(),
            field.kind().as_str(),
            if field.is_visible() { "yes" } else { "no" },
            form_value(schema, field.key()),
        ));
    }

    if !schema.rules().is_empty() {
        out.push_str("\n## Rules\n\n");
        for rule in schema.rules() {
            out.push_str(&format!(
                "- `{}` changes {}\n",
                rule.source(),
                rule.targets()
                    .iter()
                    .map(|t| format!("`{t}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }

    out
}

fn form_to_table(schema: &FormSchema) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Form: {}  Fields: {}\n",
        schema.variant(),
        schema.fields().len()
    ));

    let width = schema
        .fields()
        .iter()
        .map(|f| f.key().len())
        .max()
        .unwrap_or(3);

    for field in schema.fields().iter().filter(|f| f.kind().has_value()) {
        let hidden = if field.is_visible() { "" } else { "  (hidden)" };
        out.push_str(&format!(
            "  {:<width$}  {:<9}  {}{hidden}\n",
            field.key(),
            field.kind().as_str(),
            form_value(schema, field.key()),
        ));
    }

    out
}
