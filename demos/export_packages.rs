//! Exporting capability packages and checking catalog consistency.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p agent-schema-demos --example export_packages -- /tmp/packages
//! ```

use std::path::PathBuf;

use agent_schema_catalog::{CapabilityPackage, Catalog};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("agent-schema-packages"));
    std::fs::create_dir_all(&out)?;

    let catalog = Catalog::builtin()?;
    for agent in catalog.agents() {
        let findings = catalog.cross_check(agent)?;
        println!("{agent}: {} inconsistency(ies)", findings.len());
        for finding in findings {
            println!("  {finding}");
        }

        for variant in catalog.variants(agent)? {
            let package = catalog.package(agent, &variant)?;
            let path = out.join(format!("{agent}-{}-{}.json", variant.transport, variant.os));
            package.save(&path)?;

            let loaded = CapabilityPackage::load(&path)?;
            loaded.verify()?;
            println!(
                "  {:<14} {} command(s)  {}  {}",
                variant.to_string(),
                loaded.commands.as_array().map_or(0, Vec::len),
                &loaded.bundle_hash[..12],
                path.display()
            );
        }
    }

    Ok(())
}
