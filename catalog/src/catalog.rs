//! The enabled agents and their per-variant capabilities.

use std::collections::{BTreeMap, BTreeSet};

use agent_schema_core::{CommandSet, HelpStyle, Variant};
use agent_schema_forms::FormSchema;
use tracing::{debug, info, warn};

use crate::agents::{AgentBundle, BUILTIN_AGENTS};
use crate::check::{Inconsistency, cross_check};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::package::CapabilityPackage;

/// Command and form registries of every enabled agent, built once.
///
/// # Examples
///
/// ```
/// use agent_schema_catalog::Catalog;
/// use agent_schema_core::Variant;
///
/// let catalog = Catalog::builtin()?;
/// let http: Variant = "http/windows".parse().unwrap();
/// let commands = catalog.commands("beacon", &http)?;
/// assert!(commands.find(&["shell"]).is_some());
/// assert!(catalog.form("beacon", &http)?.is_some());
/// # Ok::<(), agent_schema_catalog::CatalogError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Catalog {
    agents: BTreeMap<String, AgentBundle>,
    help: HelpStyle,
}

impl Catalog {
    /// Empty catalog with the given help layout.
    pub fn new(help: HelpStyle) -> Self {
        Self {
            agents: BTreeMap::new(),
            help,
        }
    }

    /// Every built-in agent with default settings.
    pub fn builtin() -> Result<Self> {
        Self::from_config(&CatalogConfig::default())
    }

    /// Builds the built-in agents enabled by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] for an invalid config, and
    /// [`CatalogError::Schema`] or [`CatalogError::Form`] if a definition
    /// fails validation. Construction stops at the first error.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        config.validate()?;

        for name in &config.allowlist {
            if !BUILTIN_AGENTS.iter().any(|(builtin, _)| builtin == name) {
                warn!(agent = %name, "allowlisted agent is not built in");
            }
        }

        let mut catalog = Self::new(config.help_style());
        for (name, factory) in BUILTIN_AGENTS {
            if !config.is_allowed(name) {
                debug!(agent = name, "agent disabled by config");
                continue;
            }
            catalog.insert(factory(config)?)?;
        }

        info!(agents = catalog.agents.len(), "catalog built");
        Ok(catalog)
    }

    /// Adds an agent.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateAgent`] if the name is taken.
    pub fn insert(&mut self, bundle: AgentBundle) -> Result<()> {
        if self.agents.contains_key(&bundle.name) {
            return Err(CatalogError::DuplicateAgent(bundle.name));
        }
        self.agents.insert(bundle.name.clone(), bundle);
        Ok(())
    }

    /// Enabled agent names in sorted order.
    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Looks up an agent.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownAgent`] if it is not enabled.
    pub fn agent(&self, name: &str) -> Result<&AgentBundle> {
        self.agents
            .get(name)
            .ok_or_else(|| CatalogError::UnknownAgent(name.to_string()))
    }

    /// Command set of `agent` for `variant`; empty for unsupported variants.
    pub fn commands(&self, agent: &str, variant: &Variant) -> Result<CommandSet> {
        Ok(self.agent(agent)?.commands.select_for_variant(variant))
    }

    /// Fresh form of `agent` for `variant`, if it has one.
    pub fn form(&self, agent: &str, variant: &Variant) -> Result<Option<FormSchema>> {
        Ok(self.agent(agent)?.forms.schema_for(variant))
    }

    /// Variants for which `agent` has commands or a form, in stable order.
    pub fn variants(&self, agent: &str) -> Result<Vec<Variant>> {
        let bundle = self.agent(agent)?;
        let variants: BTreeSet<Variant> = bundle
            .commands
            .variants()
            .chain(bundle.forms.variants())
            .copied()
            .collect();
        Ok(variants.into_iter().collect())
    }

    pub fn help_style(&self) -> HelpStyle {
        self.help
    }

    /// Consistency findings between `agent`'s forms and command sets.
    pub fn cross_check(&self, agent: &str) -> Result<Vec<Inconsistency>> {
        Ok(cross_check(self.agent(agent)?))
    }

    /// Capability package of `agent` for `variant`.
    pub fn package(&self, agent: &str, variant: &Variant) -> Result<CapabilityPackage> {
        let commands = self.commands(agent, variant)?;
        let form = self.form(agent, variant)?;
        CapabilityPackage::new(agent, *variant, &commands, form.as_ref())
    }
}
