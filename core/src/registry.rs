//! Frozen command groups and the per-variant registry table.
//!
//! [`CommandSet::build`] validates a group of top-level commands and freezes
//! it. [`CommandRegistry`] maps each [`Variant`] to exactly one set, built
//! once through [`RegistryBuilder`]:
//!
//! ```
//! use agent_schema_core::*;
//!
//! let pwd = CommandSpec::define("pwd")?.with_description("Print working directory");
//! let set = CommandSet::build("beacon", vec![pwd])?;
//!
//! let http = Variant::new(Transport::Http, OsFamily::Windows);
//! let registry = CommandRegistry::builder()
//!     .register(set, [http])
//!     .build()?;
//!
//! assert_eq!(registry.select_for_variant(&http).command_names(), vec!["pwd"]);
//!
//! // Unknown variants simply have no capabilities.
//! let smb = Variant::new(Transport::Smb, OsFamily::Linux);
//! assert!(registry.select_for_variant(&smb).is_empty());
//! # Ok::<(), SchemaError>(())
//! ```
//!
//! Sets are shared behind an [`Arc`], so selecting a set is a cheap clone
//! of an immutable snapshot that can be read from any thread.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::SchemaError;
use crate::validate::validate_commands;
use crate::{CommandSpec, Variant};

/// Immutable, validated group of top-level commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSet {
    group: String,
    commands: Arc<Vec<CommandSpec>>,
}

impl CommandSet {
    /// Validates `commands` and freezes them under `group`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyGroupName`] for an empty group name, or
    /// the first violation reported by
    /// [`validate_commands`](crate::validate_commands) (duplicate top-level
    /// names included).
    pub fn build(group: &str, commands: Vec<CommandSpec>) -> Result<Self, SchemaError> {
        if group.trim().is_empty() {
            return Err(SchemaError::EmptyGroupName);
        }
        validate_commands(&commands)?;
        debug!(group, commands = commands.len(), "built command group");
        Ok(Self {
            group: group.to_string(),
            commands: Arc::new(commands),
        })
    }

    /// A set with no commands, returned for unknown variants.
    pub fn empty() -> Self {
        Self {
            group: String::new(),
            commands: Arc::new(Vec::new()),
        }
    }

    /// Group name the set was built under (empty for [`empty`](Self::empty)).
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Top-level commands in registration order.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Gets all top-level command names.
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the number of top-level commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if the set has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Finds a command by its full name path, e.g. `["ps", "run"]`.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandSpec> {
        let (first, rest) = path.split_first()?;
        let mut current = self.commands.iter().find(|c| c.name == first.as_ref())?;
        for segment in rest {
            current = current.find_subcommand(segment.as_ref())?;
        }
        Some(current)
    }

    /// Resolves the longest command path at the start of `tokens`.
    ///
    /// Returns the deepest matching command and how many tokens named it.
    ///
    /// ```
    /// use agent_schema_core::*;
    ///
    /// let run = CommandSpec::define("run")?.with_argument(ArgumentSpec::string("program", true))?;
    /// let ps = CommandSpec::define("ps")?.with_subcommands([run])?;
    /// let set = CommandSet::build("beacon", vec![ps])?;
    ///
    /// let (cmd, consumed) = set.resolve(&["ps", "run", "cmd.exe"]).unwrap();
    /// assert_eq!(cmd.name, "run");
    /// assert_eq!(consumed, 2);
    /// # Ok::<(), SchemaError>(())
    /// ```
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> Option<(&CommandSpec, usize)> {
        let (first, rest) = tokens.split_first()?;
        let mut current = self.commands.iter().find(|c| c.name == first.as_ref())?;
        let mut consumed = 1;
        for token in rest {
            match current.find_subcommand(token.as_ref()) {
                Some(sub) => {
                    current = sub;
                    consumed += 1;
                }
                None => break,
            }
        }
        Some((current, consumed))
    }
}

/// Table mapping each variant to its command set.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    table: BTreeMap<Variant, CommandSet>,
}

impl CommandRegistry {
    /// Returns a new [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the set bound to `variant`, or an empty set if none is.
    pub fn select_for_variant(&self, variant: &Variant) -> CommandSet {
        match self.table.get(variant) {
            Some(set) => set.clone(),
            None => {
                debug!(%variant, "no command set bound to variant");
                CommandSet::empty()
            }
        }
    }

    /// Returns `true` if a set is bound to `variant`.
    pub fn contains(&self, variant: &Variant) -> bool {
        self.table.contains_key(variant)
    }

    /// Bound variants in stable order.
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.table.keys()
    }

    /// Returns the number of bound variants.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no variant is bound.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Builder collecting `(set, variants)` bindings for a [`CommandRegistry`].
///
/// Bindings are checked in [`build`](Self::build): a variant may be bound to
/// only one set.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    bindings: Vec<(CommandSet, Vec<Variant>)>,
}

impl RegistryBuilder {
    /// Creates a builder with no bindings.
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Binds `set` to every variant in `variants`.
    pub fn register(mut self, set: CommandSet, variants: impl IntoIterator<Item = Variant>) -> Self {
        self.bindings.push((set, variants.into_iter().collect()));
        self
    }

    /// Freezes the table.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::VariantConflict`] if a variant was bound twice.
    pub fn build(self) -> Result<CommandRegistry, SchemaError> {
        let mut table: BTreeMap<Variant, CommandSet> = BTreeMap::new();
        for (set, variants) in self.bindings {
            for variant in variants {
                if let Some(existing) = table.get(&variant) {
                    return Err(SchemaError::VariantConflict {
                        variant: variant.to_string(),
                        group: existing.group().to_string(),
                    });
                }
                table.insert(variant, set.clone());
            }
        }
        info!(variants = table.len(), "command registry built");
        Ok(CommandRegistry { table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgumentSpec, OsFamily, Transport};

    fn job() -> CommandSpec {
        let list = CommandSpec::define("list").unwrap();
        let kill = CommandSpec::define("kill")
            .unwrap()
            .with_argument(ArgumentSpec::string("task_id", true))
            .unwrap();
        CommandSpec::define("job")
            .unwrap()
            .with_subcommands([list, kill])
            .unwrap()
    }

    #[test]
    fn test_build_rejects_duplicate_top_level() {
        let err = CommandSet::build("beacon", vec![job(), job()]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateCommand { .. }));
    }

    #[test]
    fn test_build_rejects_empty_group() {
        assert_eq!(
            CommandSet::build(" ", vec![job()]),
            Err(SchemaError::EmptyGroupName)
        );
    }

    #[test]
    fn test_find_by_path() {
        let set = CommandSet::build("beacon", vec![job()]).unwrap();
        assert_eq!(set.find(&["job", "kill"]).unwrap().arguments.len(), 1);
        assert!(set.find(&["job", "stop"]).is_none());
        assert!(set.find::<&str>(&[]).is_none());
    }

    #[test]
    fn test_resolve_stops_at_first_unknown_token() {
        let set = CommandSet::build("beacon", vec![job()]).unwrap();
        let (cmd, consumed) = set.resolve(&["job", "kill", "1a2b"]).unwrap();
        assert_eq!(cmd.name, "kill");
        assert_eq!(consumed, 2);

        let (cmd, consumed) = set.resolve(&["job"]).unwrap();
        assert_eq!(cmd.name, "job");
        assert_eq!(consumed, 1);

        assert!(set.resolve(&["nope"]).is_none());
    }

    #[test]
    fn test_variant_conflict() {
        let http = Variant::new(Transport::Http, OsFamily::Windows);
        let a = CommandSet::build("a", vec![job()]).unwrap();
        let b = CommandSet::build("b", vec![job()]).unwrap();
        let err = CommandRegistry::builder()
            .register(a, [http])
            .register(b, [http])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::VariantConflict {
                variant: "http/windows".to_string(),
                group: "a".to_string()
            }
        );
    }

    #[test]
    fn test_one_set_many_variants_shares_snapshot() {
        let smb = Variant::new(Transport::Smb, OsFamily::Windows);
        let tcp = Variant::new(Transport::Tcp, OsFamily::Windows);
        let set = CommandSet::build("beacon", vec![job()]).unwrap();
        let registry = CommandRegistry::builder()
            .register(set, [smb, tcp])
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        let a = registry.select_for_variant(&smb);
        let b = registry.select_for_variant(&tcp);
        assert!(Arc::ptr_eq(&a.commands, &b.commands));
    }
}
