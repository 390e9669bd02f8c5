//! Finalized forms and their runtime update protocol.
//!
//! A [`FormSchema`] is frozen in structure. The only state that changes after
//! [`FormBuilder::finalize`](crate::FormBuilder::finalize) is field values,
//! visibility and option lists, and only through [`FormSchema::apply_change`]:
//!
//! 1. the source field takes the new value;
//! 2. every rule keyed on that source is evaluated with the value;
//! 3. the returned mutations are applied to their declared targets.
//!
//! Mutations never trigger the targets' own rules. An update either applies
//! completely or leaves the form untouched.

use serde::Serialize;
use tracing::debug;

use agent_schema_core::Variant;

use crate::error::UpdateError;
use crate::field::{FieldSpec, FieldValue};
use crate::rule::{DependencyRule, Mutation};

/// Finalized form for one variant.
#[derive(Debug, Clone, Serialize)]
pub struct FormSchema {
    variant: Variant,
    fields: Vec<FieldSpec>,
    rules: Vec<DependencyRule>,
}

impl FormSchema {
    pub(crate) fn new(variant: Variant, fields: Vec<FieldSpec>, rules: Vec<DependencyRule>) -> Self {
        Self {
            variant,
            fields,
            rules,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Fields in creation order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key() == key)
    }

    pub fn rules(&self) -> &[DependencyRule] {
        &self.rules
    }

    /// Rules keyed on `source`.
    pub fn rules_for<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a DependencyRule> {
        self.rules.iter().filter(move |r| r.source() == source)
    }

    /// Key-to-field view used to read final values.
    pub fn container(&self) -> ConfigContainer<'_> {
        ConfigContainer {
            fields: &self.fields,
        }
    }

    /// Reports a new value for `key` and runs its dependency rules.
    ///
    /// Returns the `(target, mutation)` pairs that were applied, in
    /// evaluation order.
    ///
    /// # Errors
    ///
    /// Fails without changing any state if the field is unknown, the value
    /// does not fit it, or a rule produces a mutation for an undeclared
    /// target or one its target cannot take.
    ///
    /// # Examples
    ///
    /// ```
    /// use agent_schema_core::{OsFamily, Transport, Variant};
    /// use agent_schema_forms::{FieldOptions, FieldValue, FormBuilder, Mutation};
    ///
    /// let mut form = FormBuilder::new();
    /// form.create_field(Some("os"), FieldOptions::combo(["windows", "linux"]))?;
    /// form.create_field(Some("format"), FieldOptions::combo(["Binary EXE"]))?;
    /// form.on_change("os", ["format"], |os| {
    ///     let items = if os.to_string() == "windows" { "Binary EXE" } else { "Binary .ELF" };
    ///     vec![("format".to_string(), Mutation::SetItems(vec![items.to_string()]))]
    /// });
    /// let mut schema = form.finalize(Variant::new(Transport::Tcp, OsFamily::Linux))?;
    ///
    /// let applied = schema.apply_change("os", "linux".into()).unwrap();
    /// assert_eq!(applied.len(), 1);
    /// assert_eq!(
    ///     schema.container().value("format"),
    ///     Some(FieldValue::Text("Binary .ELF".into()))
    /// );
    /// # Ok::<(), agent_schema_forms::SchemaError>(())
    /// ```
    pub fn apply_change(
        &mut self,
        key: &str,
        value: FieldValue,
    ) -> Result<Vec<(String, Mutation)>, UpdateError> {
        let mut next = self.fields.clone();

        let source = next
            .iter_mut()
            .find(|f| f.key() == key)
            .ok_or_else(|| UpdateError::UnknownField(key.to_string()))?;
        source.set_value(value)?;
        let current = source.value();

        let mut applied = Vec::new();
        if let Some(current) = current {
            for rule in self.rules.iter().filter(|r| r.source() == key) {
                for (target, mutation) in rule.evaluate(&current) {
                    if !rule.declares_target(&target) {
                        return Err(UpdateError::UndeclaredTarget {
                            trigger: key.to_string(),
                            target,
                        });
                    }
                    let field = next
                        .iter_mut()
                        .find(|f| f.key() == target)
                        .ok_or_else(|| UpdateError::UnknownField(target.clone()))?;
                    field.apply(&mutation)?;
                    applied.push((target, mutation));
                }
            }
        }

        self.fields = next;
        debug!(field = key, mutations = applied.len(), "applied field change");
        Ok(applied)
    }

    /// Restores values saved with [`ConfigContainer::to_json`].
    ///
    /// Each saved value is routed through [`apply_change`](Self::apply_change)
    /// in field order, so rules run exactly as if an operator had entered
    /// the values. Keys the form does not know are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidValues`] if `values` is not an object,
    /// or the first update error. The form is unchanged on error.
    pub fn load_values(&mut self, values: &serde_json::Value) -> Result<(), UpdateError> {
        let saved = values.as_object().ok_or(UpdateError::InvalidValues)?;

        let mut next = self.clone();
        for field in &self.fields {
            if !field.kind().has_value() {
                continue;
            }
            let Some(raw) = saved.get(field.key()) else {
                continue;
            };
            let value = next
                .field(field.key())
                .ok_or_else(|| UpdateError::UnknownField(field.key().to_string()))?
                .parse_json(raw)?;
            next.apply_change(field.key(), value)?;
        }

        *self = next;
        Ok(())
    }
}

/// Flat key-to-field view of a [`FormSchema`].
///
/// Keys are exactly the keys created while the form was built, in creation
/// order.
#[derive(Debug, Clone, Copy)]
pub struct ConfigContainer<'a> {
    fields: &'a [FieldSpec],
}

impl<'a> ConfigContainer<'a> {
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        self.fields.iter().map(FieldSpec::key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&'a FieldSpec> {
        self.fields.iter().find(|f| f.key() == key)
    }

    /// Current value of `key`, if it exists and carries one.
    pub fn value(&self, key: &str) -> Option<FieldValue> {
        self.get(key)?.value()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values of all value-bearing fields as a JSON object.
    ///
    /// Dates and times are rendered in their display format.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .filter_map(|f| f.value_json().map(|v| (f.key().to_string(), v)))
            .collect();
        serde_json::Value::Object(map)
    }
}
