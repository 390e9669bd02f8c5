//! Catalog configuration.
//!
//! Controls which built-in agents are enabled, how help tables are aligned
//! and which top-level commands are withheld from every command set.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! allowlist:
//!   - beacon
//! exclude: []
//! help:
//!   command_width: 24
//!   subcommand_width: 20
//! hidden_commands:
//!   - exfil
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use agent_schema_core::HelpStyle;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CatalogError, Result};

/// Column widths for rendered help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpConfig {
    /// Width of the command column in the overview table.
    pub command_width: usize,
    /// Width of the subcommand column in per-command help.
    pub subcommand_width: usize,
}

impl Default for HelpConfig {
    fn default() -> Self {
        let style = HelpStyle::default();
        Self {
            command_width: style.command_width,
            subcommand_width: style.subcommand_width,
        }
    }
}

/// Top-level catalog configuration.
///
/// # Examples
///
/// ```
/// use agent_schema_catalog::CatalogConfig;
///
/// let config = CatalogConfig {
///     exclude: vec!["gopher".into()],
///     ..CatalogConfig::default()
/// };
/// assert!(config.is_allowed("beacon"));
/// assert!(!config.is_allowed("gopher"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Agents to enable (empty = all built-in agents).
    pub allowlist: Vec<String>,
    /// Agents to explicitly disable.
    pub exclude: Vec<String>,
    /// Help table layout.
    pub help: HelpConfig,
    /// Top-level command names removed from every command set. Hiding a
    /// command also hides the aliases that rewrite into it (hiding `ps`
    /// removes beacon's `shell`).
    pub hidden_commands: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            allowlist: Vec::new(),
            exclude: Vec::new(),
            help: HelpConfig::default(),
            hidden_commands: Vec::new(),
        }
    }
}

impl CatalogConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](CatalogError::IoError) if the file cannot be
    /// read, [`YamlError`](CatalogError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](CatalogError::InvalidConfig) if the values do not
    /// pass [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded catalog config");
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](CatalogError::IoError) if the file cannot be
    /// written, or [`YamlError`](CatalogError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](CatalogError::InvalidConfig) for zero help
    /// widths or an agent that is both allowlisted and excluded.
    pub fn validate(&self) -> Result<()> {
        if self.help.command_width == 0 || self.help.subcommand_width == 0 {
            return Err(CatalogError::InvalidConfig(
                "help column widths must be positive".to_string(),
            ));
        }
        if let Some(agent) = self.allowlist.iter().find(|a| self.is_excluded(a)) {
            return Err(CatalogError::InvalidConfig(format!(
                "agent '{agent}' is both allowlisted and excluded"
            )));
        }
        Ok(())
    }

    /// Returns `true` if `agent` is in the exclusion list.
    pub fn is_excluded(&self, agent: &str) -> bool {
        self.exclude.iter().any(|a| a == agent)
    }

    /// Returns `true` if `agent` should be built.
    ///
    /// An agent is allowed when it is not excluded and either the allowlist
    /// is empty or contains it.
    pub fn is_allowed(&self, agent: &str) -> bool {
        if self.is_excluded(agent) {
            return false;
        }
        self.allowlist.is_empty() || self.allowlist.iter().any(|a| a == agent)
    }

    /// Returns `true` if the top-level command `name` is withheld.
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden_commands.iter().any(|c| c == name)
    }

    pub fn help_style(&self) -> HelpStyle {
        HelpStyle {
            command_width: self.help.command_width,
            subcommand_width: self.help.subcommand_width,
        }
    }
}
