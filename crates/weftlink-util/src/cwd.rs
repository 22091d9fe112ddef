//! Scoped working-directory switching.
//!
//! The process working directory is shared, unsynchronized state. Every
//! per-package tool invocation that needs to run "as if inside" a package
//! goes through [`CwdGuard`] so the original directory is restored even when
//! the intervening step returns early or unwinds.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// RAII guard that changes the process working directory and restores the
/// previous one on drop.
#[derive(Debug)]
pub struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    /// Change into `dir`, capturing the current directory for restoration.
    ///
    /// # Errors
    /// Returns an error if the current directory cannot be read or `dir`
    /// cannot be entered.
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { previous })
    }

    /// The directory that will be restored on drop.
    #[must_use]
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        // Restore is best-effort: Drop cannot propagate, and the original
        // directory may have been removed underneath us.
        let _ = env::set_current_dir(&self.previous);
    }
}
