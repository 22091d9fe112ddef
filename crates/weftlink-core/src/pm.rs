//! Host package-manager invocations.
//!
//! The package manager is an opaque external tool. Every invocation passes
//! arguments as a vector (never through shell string interpolation, so
//! package names can't inject), and per-package runs switch directory through
//! [`CwdGuard`], which restores the original directory even if the step
//! fails. Calls are blocking; timeouts are a caller concern.

use std::io;
use std::path::Path;
use std::process::Command;
use weftlink_util::cwd::CwdGuard;

const NPM: &str = "npm";

/// Register `dir`'s package in the global link registry (`npm link`).
pub fn register_link(dir: &Path) -> io::Result<()> {
    run_in(dir, &["link"])
}

/// Refresh the lock file's metadata without touching installed files
/// (`npm install --package-lock-only`).
pub fn refresh_lockfile(dir: &Path) -> io::Result<()> {
    run_in(dir, &["install", "--package-lock-only"])
}

/// Raw output of the global link listing, or `None` when the query fails
/// outright (tool missing, no usable output). An empty registry is not an
/// error; linking degrades to "nothing is available".
#[must_use]
pub fn global_links_output() -> Option<String> {
    let output = Command::new(NPM)
        .args(["ls", "--global", "--link=true", "--parseable", "--depth=1"])
        .output()
        .ok()?;

    // npm ls exits non-zero for peer-dep noise while still printing the
    // listing; trust stdout when there is any.
    if output.stdout.is_empty() && !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn run_in(dir: &Path, args: &[&str]) -> io::Result<()> {
    let _guard = CwdGuard::enter(dir)?;
    let status = Command::new(NPM).args(args).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("npm {} exited with {status}", args.join(" "))))
    }
}
