#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use weftlink_core::LinkerConfig;

#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(author, version, about = "Monorepo dependency linker for scoped packages", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Register and link packages for development
    Link {
        /// Scope ('@acme') or exact package ('@acme/core') to propagate;
        /// omit to self-link the current package
        target: Option<String>,

        /// Report what would be done without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Workspace roots to scan (defaults to the working directory)
        #[arg(long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,

        /// Conventional source checkouts per scope (repeatable)
        #[arg(long = "scope-root", value_name = "SCOPE=DIR")]
        scope_roots: Vec<String>,

        /// Extra link-candidate patterns outside the package's own scope
        #[arg(long = "external", value_name = "PATTERN")]
        externals: Vec<String>,
    },

    /// Show which dependency slots are currently symlinked, and where
    Status {
        /// Workspace roots to scan (defaults to the working directory)
        #[arg(long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Link {
            target,
            dry_run,
            roots,
            scope_roots,
            externals,
        } => {
            let config = build_config(&cwd, roots, &scope_roots, externals, cli.json);
            commands::link::run(&cwd, &config, target.as_deref(), dry_run, cli.json)
        }
        Commands::Status { roots } => {
            let config = build_config(&cwd, roots, &[], Vec::new(), cli.json);
            commands::status::run(&config, cli.json)
        }
    }
}

/// Build the linking configuration from CLI flags. Roots default to the
/// working directory; `--scope-root` entries are `SCOPE=DIR` pairs.
fn build_config(
    cwd: &Path,
    roots: Vec<PathBuf>,
    scope_roots: &[String],
    externals: Vec<String>,
    json: bool,
) -> LinkerConfig {
    let roots = if roots.is_empty() {
        vec![cwd.to_path_buf()]
    } else {
        roots
    };

    let mut parsed = BTreeMap::new();
    for entry in scope_roots {
        let Some((scope, dir)) = entry.split_once('=') else {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": {
                            "code": "ARGS_INVALID",
                            "message": format!("--scope-root '{entry}' must be SCOPE=DIR")
                        }
                    })
                );
            } else {
                eprintln!("error: --scope-root '{entry}' must be SCOPE=DIR");
            }
            std::process::exit(1);
        };
        parsed.insert(scope.to_string(), PathBuf::from(dir));
    }

    LinkerConfig {
        roots,
        scope_roots: parsed,
        externals,
    }
}
