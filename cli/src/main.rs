mod console;

use std::fs;
use std::path::PathBuf;

use agent_schema_catalog::{
    CapabilityPackage, Catalog, CatalogConfig, OutputFormat, format_commands, format_form,
};
use agent_schema_core::{DispatchOutcome, Variant, render_command, render_overview};
use agent_schema_forms::FormSchema;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "agent-schema", disable_help_subcommand = true)]
#[command(about = "Agent command sets and payload forms for the operator console")]
struct Cli {
    /// Catalog configuration YAML (built-in defaults when omitted).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List enabled agents and the variants they support.
    Agents,
    /// Print the command set of an agent variant.
    Commands(CommandsArgs),
    /// Show console help for a command set or one command.
    Help(HelpArgs),
    /// Print the payload form of an agent variant.
    Form(FormArgs),
    /// Parse a console line and route it through the command's pre-hook.
    Dispatch(DispatchArgs),
    /// Write capability packages to disk.
    Export(ExportArgs),
    /// Cross-check forms against command sets.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Agent name (e.g. beacon, gopher).
    #[arg(long)]
    agent: String,
    /// Variant as <transport>/<os> (e.g. http/windows, tcp/linux).
    #[arg(long)]
    variant: Variant,
}

#[derive(Debug, Args)]
struct CommandsArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct HelpArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Command path (e.g. `job kill`); the overview when omitted.
    command: Vec<String>,
}

#[derive(Debug, Args)]
struct FormArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Restore saved values from a JSON object file before applying --set.
    #[arg(long)]
    values: Option<PathBuf>,
    /// Change a field, as key=value; applied in order through the form rules.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
    /// Print only the container values as JSON.
    #[arg(long)]
    values_only: bool,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct DispatchArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Session identity passed to pre-hooks.
    #[arg(long, default_value = "0")]
    session: String,
    /// Print the dispatch result as JSON.
    #[arg(long)]
    json: bool,
    /// Console line, as typed (quote it as one shell argument).
    line: String,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Agent to export; every agent when omitted.
    #[arg(long)]
    agent: Option<String>,
    /// Variant to export; every supported variant when omitted.
    #[arg(long)]
    variant: Option<Variant>,
    /// Output directory, one `<agent>-<transport>-<os>.json` per package.
    #[arg(long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Agent to check; every agent when omitted.
    #[arg(long)]
    agent: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_catalog(cli.config.as_ref()).and_then(|catalog| match cli.command {
        Command::Agents => run_agents(&catalog),
        Command::Commands(args) => run_commands(&catalog, args),
        Command::Help(args) => run_help(&catalog, args),
        Command::Form(args) => run_form(&catalog, args),
        Command::Dispatch(args) => run_dispatch(&catalog, args),
        Command::Export(args) => run_export(&catalog, args),
        Command::Check(args) => run_check(&catalog, args),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog, String> {
    let config = match path {
        Some(path) => CatalogConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => CatalogConfig::default(),
    };
    Catalog::from_config(&config).map_err(|err| err.to_string())
}

fn run_agents(catalog: &Catalog) -> Result<(), String> {
    for agent in catalog.agents() {
        let variants = catalog.variants(agent).map_err(|e| e.to_string())?;
        let variants: Vec<String> = variants.iter().map(ToString::to_string).collect();
        println!("{agent}: {}", variants.join(", "));
    }
    Ok(())
}

fn run_commands(catalog: &Catalog, args: CommandsArgs) -> Result<(), String> {
    let set = catalog
        .commands(&args.target.agent, &args.target.variant)
        .map_err(|e| e.to_string())?;
    if set.is_empty() {
        eprintln!(
            "{} has no commands for {}",
            args.target.agent, args.target.variant
        );
    }
    println!("{}", format_commands(&set, args.format)?);
    Ok(())
}

fn run_help(catalog: &Catalog, args: HelpArgs) -> Result<(), String> {
    let set = catalog
        .commands(&args.target.agent, &args.target.variant)
        .map_err(|e| e.to_string())?;
    let style = catalog.help_style();
    let text = if args.command.is_empty() {
        render_overview(&set, &style)
    } else {
        render_command(&set, &args.command, &style).map_err(|e| e.to_string())?
    };
    print!("{text}");
    Ok(())
}

fn run_form(catalog: &Catalog, args: FormArgs) -> Result<(), String> {
    let mut schema = catalog
        .form(&args.target.agent, &args.target.variant)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| {
            format!(
                "{} has no form for {}",
                args.target.agent, args.target.variant
            )
        })?;

    if let Some(path) = &args.values {
        let raw = fs::read_to_string(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
        let values: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|err| format!("Failed to parse '{}': {err}", path.display()))?;
        schema.load_values(&values).map_err(|e| e.to_string())?;
    }

    for assignment in &args.set {
        apply_assignment(&mut schema, assignment)?;
    }

    if args.values_only {
        let raw = serde_json::to_string_pretty(&schema.container().to_json())
            .map_err(|err| format!("JSON serialization failed: {err}"))?;
        println!("{raw}");
    } else {
        println!("{}", format_form(&schema, args.format)?);
    }
    Ok(())
}

/// Applies `key=value`, parsing the value the way the field expects it.
fn apply_assignment(schema: &mut FormSchema, assignment: &str) -> Result<(), String> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("Expected KEY=VALUE, got '{assignment}'"))?;
    let field = schema
        .field(key)
        .ok_or_else(|| format!("unknown field: {key}"))?;

    // Numbers and booleans arrive as text on the command line.
    let json = serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .filter(|v| v.is_number() || v.is_boolean())
        .unwrap_or_else(|| serde_json::Value::String(raw.to_string()));
    let value = field
        .parse_json(&json)
        .or_else(|_| field.parse_json(&serde_json::Value::String(raw.to_string())))
        .map_err(|e| e.to_string())?;

    let applied = schema.apply_change(key, value).map_err(|e| e.to_string())?;
    for (target, mutation) in applied {
        debug!(source = key, %target, mutation = mutation.name(), "rule applied");
    }
    Ok(())
}

fn run_dispatch(catalog: &Catalog, args: DispatchArgs) -> Result<(), String> {
    let set = catalog
        .commands(&args.target.agent, &args.target.variant)
        .map_err(|e| e.to_string())?;
    let tokens = console::tokenize(&args.line);
    let invocation = console::bind(&set, &tokens).map_err(|e| e.to_string())?;
    let outcome = set
        .dispatch(&args.session, &args.line, invocation)
        .map_err(|e| e.to_string())?;

    if args.json {
        let value = match &outcome {
            DispatchOutcome::Forward(invocation) => serde_json::json!({
                "outcome": "forward",
                "invocation": invocation,
            }),
            DispatchOutcome::Message(message) => serde_json::json!({
                "outcome": "message",
                "message": message,
            }),
            DispatchOutcome::Rewritten { original, target } => serde_json::json!({
                "outcome": "rewritten",
                "original": original,
                "target": target,
            }),
        };
        let raw = serde_json::to_string_pretty(&value)
            .map_err(|err| format!("JSON serialization failed: {err}"))?;
        println!("{raw}");
        return Ok(());
    }

    match outcome {
        DispatchOutcome::Forward(invocation) => println!("forward: {invocation}"),
        DispatchOutcome::Message(message) => println!("{message}"),
        DispatchOutcome::Rewritten { original, target } => {
            println!("rewrite: {original} -> {target}");
        }
    }
    Ok(())
}

fn run_export(catalog: &Catalog, args: ExportArgs) -> Result<(), String> {
    let agents: Vec<String> = match args.agent {
        Some(agent) => vec![agent],
        None => catalog.agents().map(ToOwned::to_owned).collect(),
    };

    fs::create_dir_all(&args.output).map_err(|err| {
        format!(
            "Failed to create output directory '{}': {err}",
            args.output.display()
        )
    })?;

    let mut written = 0usize;
    for agent in &agents {
        let variants = match args.variant {
            Some(variant) => vec![variant],
            None => catalog.variants(agent).map_err(|e| e.to_string())?,
        };
        for variant in variants {
            let package: CapabilityPackage =
                catalog.package(agent, &variant).map_err(|e| e.to_string())?;
            let path = args.output.join(format!(
                "{agent}-{}-{}.json",
                variant.transport, variant.os
            ));
            package
                .save(&path)
                .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
            written += 1;
        }
    }

    println!(
        "Exported {written} package(s) into '{}'.",
        args.output.display()
    );
    Ok(())
}

fn run_check(catalog: &Catalog, args: CheckArgs) -> Result<(), String> {
    let agents: Vec<String> = match args.agent {
        Some(agent) => vec![agent],
        None => catalog.agents().map(ToOwned::to_owned).collect(),
    };

    let mut total = 0usize;
    for agent in &agents {
        let findings = catalog.cross_check(agent).map_err(|e| e.to_string())?;
        for finding in &findings {
            println!("{agent}: {finding}");
        }
        total += findings.len();
    }

    if total > 0 {
        return Err(format!("{total} inconsistency(ies) found"));
    }
    println!("Checked {} agent(s): consistent.", agents.len());
    Ok(())
}
