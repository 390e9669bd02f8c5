//! Incremental form construction.
//!
//! [`FormBuilder`] collects fields, grid placements and dependency rules.
//! Cross-field checks (overlapping cells, rule sources and targets) run once
//! in [`FormBuilder::finalize`], so a layout can be assembled in any order.

use std::collections::BTreeMap;
use std::sync::Arc;

use agent_schema_core::Variant;
use tracing::{debug, info};

use crate::error::SchemaError;
use crate::field::{FieldKind, FieldOptions, FieldSpec, FieldValue, GridPosition};
use crate::rule::{ChangeEvent, DependencyRule, Handler, Mutation};
use crate::schema::FormSchema;

struct PendingRule {
    source: String,
    targets: Vec<String>,
    handler: Handler,
}

/// Builder for a [`FormSchema`].
///
/// # Examples
///
/// ```
/// use agent_schema_core::{OsFamily, Transport, Variant};
/// use agent_schema_forms::{FieldOptions, FormBuilder, Mutation};
///
/// let mut form = FormBuilder::new();
/// let label = form.create_field(None, FieldOptions::label("Format:"))?;
/// form.create_field(Some("format"), FieldOptions::combo(["Exe", "Service Exe"]))?;
/// form.create_field(Some("svcname"), FieldOptions::text_line("AgentService"))?;
/// assert_eq!(label, "label_1");
///
/// form.layout(&label, 0, 0, 1, 1)?
///     .layout("format", 0, 1, 1, 2)?
///     .layout("svcname", 1, 1, 1, 2)?
///     .set_visible("svcname", false)?;
///
/// form.on_change("format", ["svcname"], |value| {
///     let shown = value.to_string() == "Service Exe";
///     vec![("svcname".to_string(), Mutation::SetVisible(shown))]
/// });
///
/// let schema = form.finalize(Variant::new(Transport::Http, OsFamily::Windows))?;
/// assert_eq!(schema.fields().len(), 3);
/// # Ok::<(), agent_schema_forms::SchemaError>(())
/// ```
#[derive(Default)]
pub struct FormBuilder {
    fields: Vec<FieldSpec>,
    rules: Vec<PendingRule>,
    generated: BTreeMap<FieldKind, usize>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field and returns its key.
    ///
    /// Without a caller-supplied key, one is generated as `<kind>_<n>`.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::InvalidKey`] for an empty key or one containing whitespace;
    /// - [`SchemaError::DuplicateKey`] if the key is already used;
    /// - [`SchemaError::InvalidOptions`] for inconsistent options, such as a
    ///   spin value outside its range.
    pub fn create_field(
        &mut self,
        key: Option<&str>,
        options: FieldOptions,
    ) -> Result<String, SchemaError> {
        let key = match key {
            Some(key) => {
                if key.is_empty() || key.chars().any(char::is_whitespace) {
                    return Err(SchemaError::InvalidKey(key.to_string()));
                }
                if self.contains(key) {
                    return Err(SchemaError::DuplicateKey(key.to_string()));
                }
                key.to_string()
            }
            None => self.next_key(options.kind()),
        };
        options.validate(&key)?;

        self.fields.push(FieldSpec::new(key.clone(), options));
        Ok(key)
    }

    /// Looks up a field under construction.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    /// Keys in creation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldSpec::key)
    }

    /// Sets a field's initial visibility.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownField`] if no field has `key`.
    pub fn set_visible(&mut self, key: &str, visible: bool) -> Result<&mut Self, SchemaError> {
        self.field_mut(key)?.set_visible(visible);
        Ok(self)
    }

    /// Places a field in the grid, replacing any earlier placement.
    ///
    /// Overlaps with other fields are reported by [`finalize`](Self::finalize).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownField`] for an unknown key, or
    /// [`SchemaError::ZeroSpan`] if either span is zero.
    pub fn layout(
        &mut self,
        key: &str,
        row: u32,
        col: u32,
        row_span: u32,
        col_span: u32,
    ) -> Result<&mut Self, SchemaError> {
        if row_span == 0 || col_span == 0 {
            return Err(SchemaError::ZeroSpan(key.to_string()));
        }
        self.field_mut(key)?
            .place(GridPosition::new(row, col, row_span, col_span));
        Ok(self)
    }

    /// Registers a dependency rule on `source`.
    ///
    /// `targets` lists every field the handler may mutate. The handler must
    /// be a pure function of the source's new value.
    pub fn on_change<I, S, F>(&mut self, source: &str, targets: I, handler: F) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&FieldValue) -> Vec<(String, Mutation)> + Send + Sync + 'static,
    {
        let mut declared: Vec<String> = Vec::new();
        for target in targets {
            let target = target.into();
            if !declared.contains(&target) {
                declared.push(target);
            }
        }
        self.rules.push(PendingRule {
            source: source.to_string(),
            targets: declared,
            handler: Arc::new(handler),
        });
        self
    }

    /// Validates the form and freezes its structure.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::Overlap`] if two placed fields share a grid cell;
    /// - [`SchemaError::UnknownField`] if a rule names a missing source or target;
    /// - [`SchemaError::InvalidRuleSource`] if a rule is keyed on a label or separator;
    /// - [`SchemaError::SelfMutation`] if a rule targets its own source.
    pub fn finalize(self, variant: Variant) -> Result<FormSchema, SchemaError> {
        check_layout(&self.fields)?;

        let mut rules = Vec::with_capacity(self.rules.len());
        for pending in self.rules {
            let source = self
                .fields
                .iter()
                .find(|f| f.key() == pending.source)
                .ok_or_else(|| SchemaError::UnknownField(pending.source.clone()))?;
            let event = ChangeEvent::for_kind(source.kind())
                .ok_or_else(|| SchemaError::InvalidRuleSource(pending.source.clone()))?;

            for target in &pending.targets {
                if *target == pending.source {
                    return Err(SchemaError::SelfMutation(pending.source.clone()));
                }
                if !self.fields.iter().any(|f| f.key() == target.as_str()) {
                    return Err(SchemaError::UnknownField(target.clone()));
                }
            }

            debug!(source = %pending.source, targets = ?pending.targets, "registered dependency rule");
            rules.push(DependencyRule::new(
                pending.source,
                event,
                pending.targets,
                pending.handler,
            ));
        }

        info!(%variant, fields = self.fields.len(), rules = rules.len(), "form finalized");
        Ok(FormSchema::new(variant, self.fields, rules))
    }

    fn field_mut(&mut self, key: &str) -> Result<&mut FieldSpec, SchemaError> {
        self.fields
            .iter_mut()
            .find(|f| f.key() == key)
            .ok_or_else(|| SchemaError::UnknownField(key.to_string()))
    }

    fn next_key(&mut self, kind: FieldKind) -> String {
        let counter = self.generated.entry(kind).or_insert(0);
        loop {
            *counter += 1;
            let key = format!("{kind}_{counter}");
            if !self.fields.iter().any(|f| f.key() == key) {
                return key;
            }
        }
    }
}

fn check_layout(fields: &[FieldSpec]) -> Result<(), SchemaError> {
    let placed: Vec<(&str, GridPosition)> = fields
        .iter()
        .filter_map(|f| f.position().map(|p| (f.key(), p)))
        .collect();

    for (i, (first, a)) in placed.iter().enumerate() {
        for (second, b) in &placed[i + 1..] {
            if let Some((row, col)) = a.first_shared_cell(b) {
                return Err(SchemaError::Overlap {
                    first: first.to_string(),
                    second: second.to_string(),
                    row,
                    col,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_schema_core::{OsFamily, Transport};

    const HTTP: Variant = Variant::new(Transport::Http, OsFamily::Windows);

    #[test]
    fn test_generated_keys_skip_taken_names() {
        let mut form = FormBuilder::new();
        form.create_field(Some("label_1"), FieldOptions::label("Arch:"))
            .unwrap();
        assert_eq!(
            form.create_field(None, FieldOptions::label("Format:")).unwrap(),
            "label_2"
        );
        assert_eq!(
            form.create_field(None, FieldOptions::combo(["x64"])).unwrap(),
            "combo_1"
        );
        assert_eq!(
            form.create_field(None, FieldOptions::text_line("")).unwrap(),
            "text_line_1"
        );
    }

    #[test]
    fn test_duplicate_and_invalid_keys() {
        let mut form = FormBuilder::new();
        form.create_field(Some("arch"), FieldOptions::combo(["x64"]))
            .unwrap();
        assert_eq!(
            form.create_field(Some("arch"), FieldOptions::combo(["x86"])),
            Err(SchemaError::DuplicateKey("arch".to_string()))
        );
        assert_eq!(
            form.create_field(Some("kill date"), FieldOptions::date("dd.MM.yyyy")),
            Err(SchemaError::InvalidKey("kill date".to_string()))
        );
        assert_eq!(form.keys().collect::<Vec<_>>(), vec!["arch"]);
    }

    #[test]
    fn test_layout_rejects_unknown_and_zero_span() {
        let mut form = FormBuilder::new();
        form.create_field(Some("arch"), FieldOptions::combo(["x64"]))
            .unwrap();
        assert_eq!(
            form.layout("os", 0, 0, 1, 1).err(),
            Some(SchemaError::UnknownField("os".to_string()))
        );
        assert_eq!(
            form.layout("arch", 0, 0, 0, 1).err(),
            Some(SchemaError::ZeroSpan("arch".to_string()))
        );
    }

    #[test]
    fn test_relayout_replaces_position() {
        let mut form = FormBuilder::new();
        form.create_field(Some("a"), FieldOptions::check("A")).unwrap();
        form.create_field(Some("b"), FieldOptions::check("B")).unwrap();
        form.layout("a", 0, 0, 1, 1).unwrap();
        form.layout("b", 1, 0, 1, 1).unwrap();
        form.layout("a", 1, 0, 1, 1).unwrap();
        assert!(matches!(
            form.finalize(HTTP),
            Err(SchemaError::Overlap { .. })
        ));
    }

    #[test]
    fn test_rule_checks_at_finalize() {
        let mut form = FormBuilder::new();
        form.create_field(Some("os"), FieldOptions::combo(["windows", "linux"]))
            .unwrap();
        form.on_change("os", ["os"], |_| Vec::new());
        assert_eq!(
            form.finalize(HTTP).err(),
            Some(SchemaError::SelfMutation("os".to_string()))
        );

        let mut form = FormBuilder::new();
        form.create_field(Some("os"), FieldOptions::combo(["windows"]))
            .unwrap();
        form.on_change("os", ["win7"], |_| Vec::new());
        assert_eq!(
            form.finalize(HTTP).err(),
            Some(SchemaError::UnknownField("win7".to_string()))
        );

        let mut form = FormBuilder::new();
        form.create_field(Some("title"), FieldOptions::label("OS:"))
            .unwrap();
        form.create_field(Some("os"), FieldOptions::combo(["windows"]))
            .unwrap();
        form.on_change("title", ["os"], |_| Vec::new());
        assert_eq!(
            form.finalize(HTTP).err(),
            Some(SchemaError::InvalidRuleSource("title".to_string()))
        );
    }

    #[test]
    fn test_unplaced_fields_are_allowed() {
        let mut form = FormBuilder::new();
        form.create_field(Some("a"), FieldOptions::check("A")).unwrap();
        form.create_field(Some("b"), FieldOptions::check("B")).unwrap();
        form.layout("a", 0, 0, 1, 1).unwrap();
        let schema = form.finalize(HTTP).unwrap();
        assert_eq!(schema.field("b").unwrap().position(), None);
    }
}
