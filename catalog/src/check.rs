//! Consistency between an agent's forms and its command sets.
//!
//! Forms and command sets are defined independently but keyed by the same
//! variants. Disagreements are reported as findings, never raised.

use std::fmt;

use agent_schema_core::{OsFamily, Variant};
use agent_schema_forms::FieldOptions;
use serde::Serialize;

use crate::agents::AgentBundle;

/// Key of the form field that selects the target OS.
pub const OS_FIELD: &str = "os";

/// One disagreement between forms and command sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// The form for `variant` offers an OS that no command set supports on
    /// the same transport.
    UnsupportedOs { variant: Variant, os: String },
    /// A form exists for a variant without a command set.
    FormWithoutCommands { variant: Variant },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::UnsupportedOs { variant, os } => write!(
                f,
                "form for {variant} offers OS '{os}' but no {} command set supports it",
                variant.transport
            ),
            Inconsistency::FormWithoutCommands { variant } => {
                write!(f, "form for {variant} has no command set")
            }
        }
    }
}

/// Cross-checks every form prototype of `bundle` against its command sets.
pub fn cross_check(bundle: &AgentBundle) -> Vec<Inconsistency> {
    let mut findings = Vec::new();

    for variant in bundle.forms.variants() {
        if !bundle.commands.contains(variant) {
            findings.push(Inconsistency::FormWithoutCommands { variant: *variant });
        }

        let Some(schema) = bundle.forms.schema_for(variant) else {
            continue;
        };
        let Some(FieldOptions::Combo { items, .. }) = schema.field(OS_FIELD).map(|f| f.options())
        else {
            continue;
        };
        for item in items {
            let supported = item
                .parse::<OsFamily>()
                .map(|os| bundle.commands.contains(&Variant::new(variant.transport, os)))
                .unwrap_or(false);
            if !supported {
                findings.push(Inconsistency::UnsupportedOs {
                    variant: *variant,
                    os: item.clone(),
                });
            }
        }
    }

    findings
}
