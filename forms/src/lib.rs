//! Reactive configuration forms for payload generation.
//!
//! A form is a set of typed fields placed on a grid, plus dependency rules
//! that let one field's value change other fields' visibility, option lists
//! or values. Forms are assembled with a [`FormBuilder`], frozen per
//! [`Variant`](agent_schema_core::Variant) with [`FormBuilder::finalize`],
//! and then driven by value-change events through
//! [`FormSchema::apply_change`].
//!
//! Dependency chains are one hop long: a rule's mutations never trigger the
//! rules of the fields they touch.
//!
//! ```
//! use agent_schema_core::{OsFamily, Transport, Variant};
//! use agent_schema_forms::*;
//!
//! let mut form = FormBuilder::new();
//! form.create_field(Some("os"), FieldOptions::combo(["windows", "linux", "macos"]))?;
//! form.create_field(Some("win7"), FieldOptions::check("Windows 7 support"))?;
//! form.layout("os", 0, 1, 1, 1)?.layout("win7", 1, 1, 1, 1)?;
//! form.on_change("os", ["win7"], |os| {
//!     let windows = *os == FieldValue::Text("windows".into());
//!     vec![("win7".to_string(), Mutation::SetVisible(windows))]
//! });
//!
//! let mut schema = form.finalize(Variant::new(Transport::Tcp, OsFamily::Linux))?;
//! schema.apply_change("os", "linux".into()).unwrap();
//! assert!(!schema.field("win7").unwrap().is_visible());
//! assert_eq!(schema.container().to_json()["os"], "linux");
//! # Ok::<(), SchemaError>(())
//! ```

mod builder;
mod error;
mod field;
mod registry;
mod rule;
mod schema;

pub use builder::FormBuilder;
pub use error::{SchemaError, UpdateError};
pub use field::{
    FieldKind, FieldOptions, FieldSpec, FieldValue, GridPosition, Orientation, chrono_format,
};
pub use registry::FormRegistry;
pub use rule::{ChangeEvent, DependencyRule, Mutation};
pub use schema::{ConfigContainer, FormSchema};
