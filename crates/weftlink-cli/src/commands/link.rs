//! `weft link` command implementation.
//!
//! Link workspace packages for development without publishing.
//!
//! Usage:
//! - `weft link` - Register the current package and link its same-scope
//!   (and configured external) dependencies
//! - `weft link @scope` - Link every package under the scope into all of
//!   its consumers
//! - `weft link @scope/name` - Link one package into all of its consumers

use miette::{IntoDiagnostic, Result};
use std::path::Path;
use weftlink_core::orchestrate::{SelfLinkSummary, TargetLinkReport};
use weftlink_core::{link_target, self_link, CoreError, LinkerConfig};

/// Run the link command.
///
/// If `target` is None, self-link the package at `cwd`. Otherwise propagate
/// the targeted scope or package into every consumer under the roots.
pub fn run(
    cwd: &Path,
    config: &LinkerConfig,
    target: Option<&str>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    match target {
        None => match self_link(cwd, config, dry_run) {
            Ok(summary) => print_self_link(&summary, json),
            Err(err) => fail(&err, json),
        },
        Some(target) => match link_target(config, target, dry_run) {
            Ok(report) => print_target(&report, json),
            Err(err) => fail(&err, json),
        },
    }
}

fn fail(err: &CoreError, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": false,
                "error": {
                    "code": err.code(),
                    "message": err.to_string()
                }
            })
        );
    } else {
        eprintln!("error: {err}");
        if matches!(err, CoreError::TargetNotScoped { .. }) {
            eprintln!("hint: targets look like '@scope' or '@scope/name'");
        }
    }
    std::process::exit(1);
}

fn print_self_link(summary: &SelfLinkSummary, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(summary).into_diagnostic()?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("ok".into(), true.into());
            obj.insert("action".into(), "self-link".into());
        }
        println!("{value}");
        return Ok(());
    }

    let suffix = if summary.dry_run { " (dry run)" } else { "" };
    println!(
        "Linked {} of {} candidate dependencies for {}{}",
        summary.linked.len(),
        summary.requested.len(),
        summary.package,
        suffix
    );
    for link in &summary.linked {
        println!(
            "  + {} ({}) -> {}",
            link.name,
            link.outcome.as_str(),
            link.source.display()
        );
    }
    for skip in &summary.skipped {
        println!("  - {}: {}", skip.name, skip.reason);
    }

    Ok(())
}

fn print_target(report: &TargetLinkReport, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(report).into_diagnostic()?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("ok".into(), true.into());
            obj.insert("action".into(), "link".into());
        }
        println!("{value}");
        return Ok(());
    }

    if report.sources.is_empty() {
        println!("No packages match {}.", report.target);
        println!("hint: check --root and that the package names a matching scope");
        return Ok(());
    }

    let suffix = if report.dry_run { " (dry run)" } else { "" };
    for source in &report.sources {
        println!(
            "{} -> {} consumer(s){}",
            source.name,
            source.consumers.len(),
            suffix
        );
        for consumer in &source.consumers {
            println!(
                "  + {} ({})",
                consumer.name,
                consumer.outcome.as_str()
            );
        }
    }

    Ok(())
}
