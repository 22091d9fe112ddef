//! `weft status` command implementation.
//!
//! Read-only report of which dependency slots are currently symlinks, where
//! each one points, and which linked versions fail their declared range.

use miette::{IntoDiagnostic, Result};
use weftlink_core::{status, LinkerConfig};

pub fn run(config: &LinkerConfig, json: bool) -> Result<()> {
    let mut report = status(config);
    // Deterministic presentation; the engine reports in scan order.
    report.packages.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        let mut value = serde_json::to_value(&report).into_diagnostic()?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("ok".into(), true.into());
        }
        println!("{value}");
        return Ok(());
    }

    let linked: Vec<_> = report
        .packages
        .iter()
        .filter(|p| !p.links.is_empty())
        .collect();

    if linked.is_empty() {
        println!("No linked dependencies found.");
        return Ok(());
    }

    for package in linked {
        println!("{}  {}", package.name, package.dir.display());
        for link in &package.links {
            let tag = if link.external { "external" } else { "internal" };
            println!("  {} -> {} [{}]", link.name, link.target.display(), tag);
        }
        if !package.incompatible.is_empty() {
            println!("  ! incompatible: {}", package.incompatible.join(", "));
        }
    }

    Ok(())
}
