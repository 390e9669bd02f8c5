//! Built-in agent definitions.
//!
//! Each agent module declares its command groups and payload forms as plain
//! tables of builder calls and binds them to the variants it supports.

pub mod beacon;
pub mod gopher;

use agent_schema_core::{
    ArgumentSpec, CommandRegistry, CommandSet, CommandSpec, SchemaError,
};
use agent_schema_forms::FormRegistry;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::error::Result;

/// Command registry and form registry of one agent.
#[derive(Debug, Clone)]
pub struct AgentBundle {
    pub name: String,
    pub commands: CommandRegistry,
    pub forms: FormRegistry,
}

/// Constructor of a built-in agent.
pub type AgentFactory = fn(&CatalogConfig) -> Result<AgentBundle>;

/// Built-in agents in listing order.
pub const BUILTIN_AGENTS: &[(&str, AgentFactory)] =
    &[(beacon::NAME, beacon::build), (gopher::NAME, gopher::build)];

/// Leaf command with its positional order taken from `args`.
fn leaf(
    name: &str,
    description: &str,
    example: &str,
    args: Vec<ArgumentSpec>,
) -> std::result::Result<CommandSpec, SchemaError> {
    let mut command = CommandSpec::define(name)?.with_description(description);
    if !example.is_empty() {
        command = command.with_example(example);
    }
    for arg in args {
        command.add_argument(arg)?;
    }
    Ok(command)
}

fn node(
    name: &str,
    description: &str,
    children: Vec<CommandSpec>,
) -> std::result::Result<CommandSpec, SchemaError> {
    CommandSpec::define(name)?
        .with_description(description)
        .with_subcommands(children)
}

/// Freezes a group after dropping hidden top-level commands.
///
/// `aliases` pairs each rewriting command with the top-level command its
/// hook targets. An alias whose target is hidden could only fail at
/// dispatch, so it is dropped as well.
fn group(
    name: &str,
    commands: Vec<CommandSpec>,
    aliases: &[(&str, &str)],
    config: &CatalogConfig,
) -> std::result::Result<CommandSet, SchemaError> {
    let commands: Vec<CommandSpec> = commands
        .into_iter()
        .filter(|c| {
            if config.is_hidden(&c.name) {
                debug!(group = name, command = %c.name, "hiding command");
                return false;
            }
            let orphaned = aliases
                .iter()
                .find(|(alias, target)| *alias == c.name && config.is_hidden(target));
            if let Some((alias, target)) = orphaned {
                warn!(group = name, alias, target, "hiding alias of hidden command");
                return false;
            }
            true
        })
        .collect();
    CommandSet::build(name, commands)
}
