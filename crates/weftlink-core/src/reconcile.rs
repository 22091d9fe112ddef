//! Idempotent symlink reconciliation for dependency slots.
//!
//! Given a dependency name and its source directory, guarantees the
//! consumer's dependency slot is a symlink pointing at that source. The slot
//! state is recomputed on every call; re-running is always safe, and a second
//! run with identical arguments performs no filesystem mutation.
//!
//! The link target is the relative path from the slot's parent to the source
//! directory, never an absolute path, so a workspace can be relocated
//! without breaking its links.

use crate::error::CoreError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use serde::Serialize;
use tracing::{debug, info};
use weftlink_util::fs::{absolutize, relative_from};

/// What currently occupies a dependency slot. Transient; recomputed per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Missing,
    CorrectSymlink,
    WrongSymlink(PathBuf),
    OccupiedByDirectory,
    OccupiedByFile,
}

/// What reconciliation did (or, in dry-run mode, would do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileOutcome {
    /// The slot was empty; a link was created.
    Created,
    /// Something wrong occupied the slot; it was replaced with the link.
    Fixed,
    /// The correct link was already in place; nothing was touched.
    AlreadyLinked,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Fixed => "fixed",
            Self::AlreadyLinked => "already-linked",
        }
    }
}

/// The dependency slot path for `name` under `consumer_root`.
///
/// A scoped name (`@scope/name`) maps to a two-level nested slot; an
/// unscoped name maps to a single directory.
#[must_use]
pub fn slot_path(consumer_root: &Path, name: &str) -> PathBuf {
    let mut slot = consumer_root.join("node_modules");
    for part in name.split('/') {
        slot.push(part);
    }
    slot
}

/// Classify what currently occupies `slot`, given the link target we expect.
#[must_use]
pub fn classify_slot(slot: &Path, expected_target: &Path) -> SlotState {
    let Ok(meta) = fs::symlink_metadata(slot) else {
        return SlotState::Missing;
    };

    if meta.file_type().is_symlink() {
        return match fs::read_link(slot) {
            Ok(target) if target == expected_target => SlotState::CorrectSymlink,
            Ok(target) => SlotState::WrongSymlink(target),
            // Unreadable link: treat as wrong so it gets replaced.
            Err(_) => SlotState::WrongSymlink(PathBuf::new()),
        };
    }

    if meta.is_dir() {
        SlotState::OccupiedByDirectory
    } else {
        SlotState::OccupiedByFile
    }
}

/// Ensure the `name` slot under `consumer_root` is a relative symlink to
/// `source_dir`.
///
/// In dry-run mode no filesystem mutation occurs; the returned outcome still
/// reports what would have been done.
pub fn reconcile(
    name: &str,
    source_dir: &Path,
    consumer_root: &Path,
    dry_run: bool,
) -> Result<ReconcileOutcome, CoreError> {
    let slot = slot_path(&absolutize(consumer_root), name);
    let parent = slot
        .parent()
        .ok_or_else(|| link_error(name, "dependency slot has no parent directory"))?
        .to_path_buf();
    let expected = relative_from(&parent, &absolutize(source_dir));

    match classify_slot(&slot, &expected) {
        SlotState::CorrectSymlink => {
            debug!(dependency = name, "link already correct");
            Ok(ReconcileOutcome::AlreadyLinked)
        }
        SlotState::Missing => {
            if !dry_run {
                fs::create_dir_all(&parent).map_err(|e| io_link_error(name, &e))?;
                make_symlink(&expected, &slot).map_err(|e| io_link_error(name, &e))?;
            }
            info!(
                dependency = name,
                target = %expected.display(),
                "created link"
            );
            Ok(ReconcileOutcome::Created)
        }
        SlotState::WrongSymlink(old) => {
            if !dry_run {
                fs::remove_file(&slot).map_err(|e| io_link_error(name, &e))?;
                make_symlink(&expected, &slot).map_err(|e| io_link_error(name, &e))?;
            }
            info!(
                dependency = name,
                old = %old.display(),
                target = %expected.display(),
                "fixed link"
            );
            Ok(ReconcileOutcome::Fixed)
        }
        SlotState::OccupiedByDirectory => {
            if !dry_run {
                fs::remove_dir_all(&slot).map_err(|e| io_link_error(name, &e))?;
                make_symlink(&expected, &slot).map_err(|e| io_link_error(name, &e))?;
            }
            info!(dependency = name, "replaced directory with link");
            Ok(ReconcileOutcome::Fixed)
        }
        SlotState::OccupiedByFile => {
            if !dry_run {
                fs::remove_file(&slot).map_err(|e| io_link_error(name, &e))?;
                make_symlink(&expected, &slot).map_err(|e| io_link_error(name, &e))?;
            }
            info!(dependency = name, "replaced file with link");
            Ok(ReconcileOutcome::Fixed)
        }
    }
}

fn make_symlink(target: &Path, slot: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, slot)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_dir(target, slot)
    }
}

fn link_error(name: &str, reason: impl Into<String>) -> CoreError {
    CoreError::Link {
        dependency: name.to_string(),
        reason: reason.into(),
    }
}

fn io_link_error(name: &str, err: &io::Error) -> CoreError {
    link_error(name, err.to_string())
}
