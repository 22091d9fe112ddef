//! Version compatibility for linked dependencies.
//!
//! The host package manager's resolver is the wrong tool for live links: it
//! rejects a prerelease of the correct minor line against a caret range, and
//! it accepts a higher minor that a linked sibling should not silently
//! drift to. For caret ranges, compatibility here means exact major/minor
//! agreement — a prerelease of the right minor line is always accepted, and
//! a clean higher minor is always rejected (the sibling moved ahead without
//! the consumer's range being bumped). Every other range form defers to
//! standard range satisfaction against the prerelease-stripped version.
//! Anything unparseable is incompatible: fail closed.

use crate::manifest::Manifest;
use semver::{BuildMetadata, Prerelease, Version, VersionReq};
use std::collections::BTreeMap;

/// Whether `linked` (the version actually at the end of a link) is safe for
/// a consumer declaring `declared`.
#[must_use]
pub fn is_compatible(linked: &str, declared: &str) -> bool {
    let Ok(version) = Version::parse(linked.trim()) else {
        return false;
    };
    let declared = declared.trim();

    if let Some((major, minor)) = caret_major_minor(declared) {
        return version.major == major && version.minor == minor;
    }

    let base = stripped(&version);

    // An exact declared version means exact (npm semantics), not the caret
    // default the semver crate gives bare versions.
    if let Ok(exact) = Version::parse(declared) {
        return base == exact;
    }

    let Ok(req) = VersionReq::parse(&normalize_range(declared)) else {
        return false;
    };
    req.matches(&base)
}

/// Dependencies of `manifest` that are currently linked (present in
/// `linked_versions`) but version-incompatible with their declared range.
///
/// Reporting only; nothing is repaired here.
#[must_use]
pub fn find_compatibility_problems(
    manifest: &Manifest,
    linked_versions: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut problems: Vec<String> = manifest
        .iter_all()
        .filter_map(|(_, name, range)| {
            let linked = linked_versions.get(name)?;
            (!is_compatible(linked, range)).then(|| name.to_string())
        })
        .collect();

    problems.sort();
    problems.dedup();
    problems
}

/// Major/minor of a caret range (`^4`, `^4.4`, `^4.4.53`), with a missing
/// minor coerced to 0. `None` for anything that is not caret-shaped.
fn caret_major_minor(range: &str) -> Option<(u64, u64)> {
    let rest = range.strip_prefix('^')?.trim();
    let mut parts = rest.split('.');

    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

fn stripped(version: &Version) -> Version {
    let mut base = version.clone();
    base.pre = Prerelease::EMPTY;
    base.build = BuildMetadata::EMPTY;
    base
}

/// npm allows space-separated comparators to mean AND; the semver crate
/// wants commas.
fn normalize_range(range: &str) -> String {
    range.split_whitespace().collect::<Vec<_>>().join(", ")
}
