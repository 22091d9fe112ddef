//! Global link-registry queries.
//!
//! The host package manager's global link table is ground truth for "is X
//! available to link right now"; it is queried fresh on every invocation and
//! never cached. Each listed directory's manifest is re-read to recover the
//! authoritative package name — the directory basename is not trusted, since
//! a package can be checked out under any folder name.

use crate::manifest::{read_manifest, MANIFEST_FILE};
use crate::pm;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Map of globally-registered package name to its source directory.
///
/// A failed registry query yields an empty map, not an error. Entries whose
/// manifest cannot be read are silently omitted.
#[must_use]
pub fn list_global_links() -> BTreeMap<String, PathBuf> {
    match pm::global_links_output() {
        Some(output) => links_from_listing(&output),
        None => BTreeMap::new(),
    }
}

/// Parse a `--parseable` listing (one path per line) into name -> source dir.
///
/// The listing includes the global registry root itself; it carries no
/// manifest, so it drops out naturally.
fn links_from_listing(output: &str) -> BTreeMap<String, PathBuf> {
    let mut links = BTreeMap::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Resolve through the registry's own symlink to the source checkout.
        let dir = PathBuf::from(line);
        let dir = dunce::canonicalize(&dir).unwrap_or(dir);

        let Ok(manifest) = read_manifest(&dir.join(MANIFEST_FILE)) else {
            continue;
        };
        let Some(name) = manifest.name else {
            continue;
        };

        links.insert(name, dir);
    }

    links
}
