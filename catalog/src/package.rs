//! Capability packages: one agent variant's commands and form, frozen to
//! a JSON file for collaborators that cannot link the catalog.
//!
//! A package records a SHA-256 hash over the canonical JSON of its commands
//! and form, so a consumer can detect hand edits or truncation.
//!
//! # Examples
//!
//! ```no_run
//! use agent_schema_catalog::{CapabilityPackage, Catalog};
//!
//! let catalog = Catalog::builtin().unwrap();
//! let variant = "tcp/linux".parse().unwrap();
//! let package = catalog.package("gopher", &variant).unwrap();
//! package.save("gopher-tcp-linux.json").unwrap();
//!
//! let loaded = CapabilityPackage::load("gopher-tcp-linux.json").unwrap();
//! loaded.verify().unwrap();
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use agent_schema_core::{CommandSet, Variant};
use agent_schema_forms::FormSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, Result};

/// Package format version written into every package.
pub const PACKAGE_SCHEMA_VERSION: &str = "1.0";

/// Exported capabilities of one agent variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityPackage {
    /// Package format version.
    pub schema_version: String,
    pub agent: String,
    pub variant: Variant,
    /// RFC 3339 timestamp of the export.
    pub generated_at: String,
    /// SHA-256 hex digest of the canonical JSON of `commands` and `form`.
    pub bundle_hash: String,
    /// Serialized top-level commands, in group order.
    pub commands: serde_json::Value,
    /// Serialized form schema, if the variant has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<serde_json::Value>,
}

impl CapabilityPackage {
    /// Packages `commands` and `form`, stamping the current time and hash.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError`](CatalogError::JsonError) if serialization fails.
    pub fn new(
        agent: &str,
        variant: Variant,
        commands: &CommandSet,
        form: Option<&FormSchema>,
    ) -> Result<Self> {
        let commands = serde_json::to_value(commands.commands())?;
        let form = form.map(serde_json::to_value).transpose()?;
        let bundle_hash = bundle_hash(&commands, form.as_ref())?;
        Ok(Self {
            schema_version: PACKAGE_SCHEMA_VERSION.to_string(),
            agent: agent.to_string(),
            variant,
            generated_at: chrono::Utc::now().to_rfc3339(),
            bundle_hash,
            commands,
            form,
        })
    }

    /// Loads a package from a JSON file.
    ///
    /// The hash is not checked; call [`verify`](Self::verify) for that.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](CatalogError::IoError) if the file cannot be
    /// read, or [`JsonError`](CatalogError::JsonError) if the content is not
    /// valid package JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let package = serde_json::from_reader(reader)?;
        Ok(package)
    }

    /// Saves the package as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](CatalogError::IoError) if the file cannot be
    /// written, or [`JsonError`](CatalogError::JsonError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Recomputes the bundle hash and compares it with the recorded one.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidChecksum`](CatalogError::InvalidChecksum) on a
    /// mismatch.
    pub fn verify(&self) -> Result<()> {
        let actual = bundle_hash(&self.commands, self.form.as_ref())?;
        if actual != self.bundle_hash {
            return Err(CatalogError::InvalidChecksum(format!(
                "{}/{}: recorded {}, computed {actual}",
                self.agent, self.variant, self.bundle_hash
            )));
        }
        Ok(())
    }
}

/// SHA-256 hex digest over the compact JSON of `commands` and `form`.
///
/// `serde_json` maps keep their keys sorted, so equal content always yields
/// the same bytes.
pub fn bundle_hash(
    commands: &serde_json::Value,
    form: Option<&serde_json::Value>,
) -> Result<String> {
    let canonical = serde_json::json!({
        "commands": commands,
        "form": form,
    });
    let bytes = serde_json::to_vec(&canonical)?;
    let hash = Sha256::digest(&bytes);
    Ok(format!("{:x}", hash))
}
