//! Driving a payload form through its dependency rules.
//!
//! Fetches the built-in beacon form, simulates operator edits and prints
//! the fields whose state each edit changed, then the final values.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p agent-schema-demos --example payload_form
//! ```

use agent_schema_catalog::Catalog;
use agent_schema_core::Variant;
use agent_schema_forms::FieldValue;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::builtin()?;
    let variant: Variant = "http/windows".parse()?;
    let mut form = catalog
        .form("beacon", &variant)?
        .ok_or("beacon has no form for http/windows")?;

    println!("=== Initial layout ({}) ===", form.variant());
    for field in form.fields() {
        let position = field
            .position()
            .map(|p| format!("{},{}", p.row, p.col))
            .unwrap_or_default();
        println!(
            "  {:<16} {:<10} {:<6} {}",
            field.key(),
            field.kind().as_str(),
            position,
            if field.is_visible() { "" } else { "hidden" }
        );
    }

    println!();
    println!("=== Edits ===");
    let edits = [
        ("format", FieldValue::from("Service Exe")),
        ("jitter", FieldValue::from(20_i64)),
        ("is_killdate", FieldValue::from(true)),
        ("kill_date", FieldValue::from("28.02.2030")),
    ];
    for (key, value) in edits {
        let applied = form.apply_change(key, value)?;
        println!("  {key}: {} rule mutation(s)", applied.len());
        for (target, mutation) in applied {
            println!("    {target} <- {}", serde_json::to_string(&mutation)?);
        }
    }

    println!();
    println!("=== Container ===");
    println!("{}", serde_json::to_string_pretty(&form.container().to_json())?);

    Ok(())
}
