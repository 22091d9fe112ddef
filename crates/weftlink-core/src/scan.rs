//! Directory-tree scanning for package manifests.
//!
//! Walks each root, collecting every `package.json` location while skipping
//! build output, dependency caches, version-control metadata, and anything
//! deeper than [`MAX_SCAN_DEPTH`] levels below the root. Unreadable
//! directories are skipped, not fatal. Results across roots are concatenated
//! in root order; overlapping roots are not de-duplicated.

use crate::manifest::MANIFEST_FILE;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".hg",
    ".svn",
    "dist",
    "build",
    "out",
    "coverage",
    ".next",
    ".turbo",
    ".cache",
    "target",
];

/// Maximum directory depth below a scan root that is searched.
pub const MAX_SCAN_DEPTH: usize = 5;

/// A discovered manifest location. Request-scoped; not persisted.
#[derive(Debug, Clone)]
pub struct PackageLocation {
    /// Absolute (or root-relative, if the root was relative) manifest path.
    pub manifest_path: PathBuf,
    /// The directory containing the manifest.
    pub dir: PathBuf,
    /// Manifest path relative to the scan root that found it.
    pub relative: PathBuf,
}

/// Scan a single root for package manifests.
#[must_use]
pub fn scan_root(root: &Path) -> Vec<PackageLocation> {
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        // +1: a manifest at depth N sits inside a directory at depth N.
        .max_depth(MAX_SCAN_DEPTH + 1)
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!("skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };

        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE {
            let manifest_path = entry.into_path();
            let dir = manifest_path
                .parent()
                .unwrap_or(root)
                .to_path_buf();
            let relative = manifest_path
                .strip_prefix(root)
                .unwrap_or(&manifest_path)
                .to_path_buf();
            found.push(PackageLocation {
                manifest_path,
                dir,
                relative,
            });
        }
    }

    found
}

/// Scan multiple roots, fanned out per root, concatenated in root order.
#[must_use]
pub fn scan_roots(roots: &[PathBuf]) -> Vec<PackageLocation> {
    roots
        .par_iter()
        .map(|root| scan_root(root))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}
