//! Per-variant form prototypes.

use std::collections::BTreeMap;

use agent_schema_core::Variant;
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::FormSchema;

/// Table mapping each variant to a finalized form prototype.
///
/// Prototypes are never mutated; [`schema_for`](Self::schema_for) hands out
/// an independent copy whose state starts from the prototype's defaults.
#[derive(Debug, Clone, Default)]
pub struct FormRegistry {
    table: BTreeMap<Variant, FormSchema>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from finalized schemas, keyed by their variant.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::VariantConflict`] if two schemas share a variant.
    pub fn from_schemas(schemas: impl IntoIterator<Item = FormSchema>) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.insert(schema)?;
        }
        Ok(registry)
    }

    /// Registers a prototype under its variant.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::VariantConflict`] if the variant already has one.
    pub fn insert(&mut self, schema: FormSchema) -> Result<(), SchemaError> {
        let variant = schema.variant();
        if self.table.contains_key(&variant) {
            return Err(SchemaError::VariantConflict(variant.to_string()));
        }
        debug!(%variant, "registered form prototype");
        self.table.insert(variant, schema);
        Ok(())
    }

    /// Fresh copy of the form for `variant`, or `None` if none is registered.
    pub fn schema_for(&self, variant: &Variant) -> Option<FormSchema> {
        self.table.get(variant).cloned()
    }

    pub fn contains(&self, variant: &Variant) -> bool {
        self.table.contains_key(variant)
    }

    /// Registered variants in stable order.
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.table.keys()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
