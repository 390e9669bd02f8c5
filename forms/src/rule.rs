//! Dependency rules: one-hop reactions of target fields to a source field.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{FieldKind, FieldValue};

/// Change to a target field's mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Mutation {
    SetVisible(bool),
    /// Replaces a combo's items and selects the first one.
    SetItems(Vec<String>),
    /// Replaces a spin's range, clamping its value into it.
    SetRange { min: i64, max: i64 },
    SetValue(FieldValue),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetVisible(_) => "set_visible",
            Mutation::SetItems(_) => "set_items",
            Mutation::SetRange { .. } => "set_range",
            Mutation::SetValue(_) => "set_value",
        }
    }
}

/// Signal a source field emits when its value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Combo selection or text line edits.
    TextChanged,
    /// Spin, date or time edits.
    ValueChanged,
    /// Check box toggles.
    StateChanged,
}

impl ChangeEvent {
    /// Event emitted by fields of `kind`, or `None` if they never change.
    pub fn for_kind(kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Combo | FieldKind::TextLine => Some(ChangeEvent::TextChanged),
            FieldKind::Spin | FieldKind::Date | FieldKind::Time => Some(ChangeEvent::ValueChanged),
            FieldKind::Check => Some(ChangeEvent::StateChanged),
            FieldKind::Label | FieldKind::Separator => None,
        }
    }
}

pub(crate) type Handler = Arc<dyn Fn(&FieldValue) -> Vec<(String, Mutation)> + Send + Sync>;

/// Reaction of declared target fields to changes of a source field.
///
/// The handler is a pure function of the source's new value. Its mutations
/// are applied to the targets without evaluating the targets' own rules.
#[derive(Clone, Serialize)]
pub struct DependencyRule {
    source: String,
    event: ChangeEvent,
    targets: Vec<String>,
    #[serde(skip)]
    handler: Handler,
}

impl DependencyRule {
    pub(crate) fn new(
        source: String,
        event: ChangeEvent,
        targets: Vec<String>,
        handler: Handler,
    ) -> Self {
        Self {
            source,
            event,
            targets,
            handler,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn event(&self) -> ChangeEvent {
        self.event
    }

    /// Fields the handler may mutate.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn declares_target(&self, key: &str) -> bool {
        self.targets.iter().any(|t| t == key)
    }

    /// Runs the handler for a new source value.
    pub fn evaluate(&self, value: &FieldValue) -> Vec<(String, Mutation)> {
        (self.handler)(value)
    }
}

impl fmt::Debug for DependencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRule")
            .field("source", &self.source)
            .field("event", &self.event)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_per_kind() {
        assert_eq!(
            ChangeEvent::for_kind(FieldKind::Combo),
            Some(ChangeEvent::TextChanged)
        );
        assert_eq!(
            ChangeEvent::for_kind(FieldKind::Check),
            Some(ChangeEvent::StateChanged)
        );
        assert_eq!(ChangeEvent::for_kind(FieldKind::Separator), None);
    }

    #[test]
    fn test_mutation_serialization() {
        let json = serde_json::to_value(Mutation::SetRange { min: 0, max: 100 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "set_range", "arg": {"min": 0, "max": 100}})
        );

        let json = serde_json::to_value(Mutation::SetVisible(false)).unwrap();
        assert_eq!(json, serde_json::json!({"op": "set_visible", "arg": false}));
    }

    #[test]
    fn test_rule_serializes_without_handler() {
        let rule = DependencyRule::new(
            "format".to_string(),
            ChangeEvent::TextChanged,
            vec!["svcname".to_string()],
            Arc::new(|_: &FieldValue| Vec::<(String, Mutation)>::new()),
        );
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            serde_json::json!({
                "source": "format",
                "event": "text_changed",
                "targets": ["svcname"]
            })
        );
        assert!(rule.declares_target("svcname"));
        assert!(!rule.declares_target("format"));
    }
}
