//! Built-in agent capabilities for the operator console.
//!
//! The catalog owns the command and form definitions of every built-in agent
//! and builds each agent's [`CommandRegistry`](agent_schema_core::CommandRegistry)
//! and [`FormRegistry`](agent_schema_forms::FormRegistry) once. It also
//! provides:
//!
//! - **Configuration** ([`CatalogConfig`]): YAML settings that enable agents,
//!   hide commands and size help tables.
//! - **Cross-checks** ([`Inconsistency`]): disagreements between an agent's
//!   forms and its command sets.
//! - **Packages** ([`CapabilityPackage`]): one variant's commands and form
//!   as hashed JSON.
//! - **Output** ([`format_commands`], [`format_form`]): JSON, YAML, Markdown
//!   and text tables.
//!
//! # Examples
//!
//! ```
//! use agent_schema_catalog::Catalog;
//!
//! let catalog = Catalog::builtin()?;
//! for agent in catalog.agents() {
//!     assert!(catalog.cross_check(agent)?.is_empty());
//! }
//!
//! let linux = "tcp/linux".parse().unwrap();
//! let form = catalog.form("gopher", &linux)?.unwrap();
//! assert_eq!(form.container().to_json()["format"], "Binary .ELF");
//! # Ok::<(), agent_schema_catalog::CatalogError>(())
//! ```

pub mod agents;
pub mod catalog;
pub mod check;
pub mod config;
pub mod error;
pub mod output;
pub mod package;

pub use agents::{AgentBundle, AgentFactory, BUILTIN_AGENTS};
pub use catalog::Catalog;
pub use check::{Inconsistency, OS_FIELD, cross_check};
pub use config::{CatalogConfig, HelpConfig};
pub use error::{CatalogError, Result};
pub use output::{OutputFormat, format_commands, format_form};
pub use package::{CapabilityPackage, PACKAGE_SCHEMA_VERSION, bundle_hash};
