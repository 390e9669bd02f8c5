//! Command registry for agent console capability schemas.
//!
//! This crate describes what an operator console can ask a controlled agent
//! to do, per target [`Variant`] (transport × OS family):
//!
//! - [`CommandSpec`]: one command, either a leaf with ordered
//!   [`ArgumentSpec`]s or an internal node with subcommands.
//! - [`CommandSet`]: a validated, frozen group of top-level commands.
//! - [`CommandRegistry`]: the table binding each variant to its set.
//! - [`PreHook`]: a rewrite function that may turn one invocation into a
//!   structured invocation of another registered command
//!   ([`CommandSet::dispatch`]).
//!
//! Validation ([`validate_commands`]) runs when a set is built, so every set
//! handed out by the registry is structurally sound. Tokenizing operator
//! input and executing commands are left to the console.
//!
//! # Example
//!
//! ```
//! use agent_schema_core::*;
//!
//! let list = CommandSpec::define("list")?.with_description("List of jobs");
//! let kill = CommandSpec::define("kill")?
//!     .with_description("Kill a specified job")
//!     .with_argument(ArgumentSpec::string("task_id", true))?;
//! let job = CommandSpec::define("job")?.with_subcommands([list, kill])?;
//!
//! let http = Variant::new(Transport::Http, OsFamily::Windows);
//! let registry = CommandRegistry::builder()
//!     .register(CommandSet::build("beacon", vec![job])?, [http])
//!     .build()?;
//!
//! let set = registry.select_for_variant(&http);
//! assert_eq!(set.find(&["job"]).unwrap().subcommand_names(), vec!["list", "kill"]);
//! # Ok::<(), SchemaError>(())
//! ```

mod dispatch;
mod error;
mod help;
mod registry;
mod types;
mod validate;
mod variant;

pub use dispatch::{
    ArgValue, DispatchOutcome, HookContext, HookOutcome, Invocation, InvocationArg, PreHook,
};
pub use error::{DispatchError, SchemaError, VariantParseError};
pub use help::{HelpStyle, render_command, render_overview};
pub use registry::{CommandRegistry, CommandSet, RegistryBuilder};
pub use types::*;
pub use validate::{check_argument, validate_commands};
pub use variant::{OsFamily, Transport, Variant};
